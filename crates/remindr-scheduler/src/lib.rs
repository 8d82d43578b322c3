//! # Remindr Scheduler
//!
//! The reminder dispatch engine.
//!
//! ## Architecture
//! ```text
//! ReminderService::run(request)
//!   ├── parse_period("1 day")            → window
//!   ├── resolve timezone                 → chrono_tz::Tz
//!   ├── SessionStore::upcoming_sessions  → Vec<Session>
//!   ├── enrich (Location once per session) → Vec<Attendee>
//!   └── Dispatcher::dispatch (one spawned task per attendee)
//!         └── DeliveryPipeline: render → shorten (degrades) → compose → format_cell → send
//! ```
//!
//! The first failing task decides the outcome; every other task still runs to
//! completion or to its own timeout.

pub mod dispatch;
pub mod enrich;
pub mod persistence;
pub mod pipeline;
pub mod service;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dispatch::{DispatchContext, DispatchReport, Dispatcher};
pub use enrich::{enrich_all, enrich_session};
pub use persistence::{ImportSummary, SessionDb};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline, PipelineTimeouts};
pub use service::ReminderService;
pub use store::MemorySessionStore;
