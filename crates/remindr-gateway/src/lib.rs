//! # Remindr Gateway
//!
//! HTTP entry point for dispatch runs. A scheduler (cron job, cloud scheduler)
//! POSTs a job request; the gateway parses it, runs the [`ReminderService`],
//! and maps the outcome to a status code.
//!
//! [`ReminderService`]: remindr_scheduler::ReminderService

pub mod routes;
pub mod server;

pub use routes::ApiError;
pub use server::{AppState, build_router, start_server};
