//! # Remindr Core
//!
//! Shared building blocks for the reminder dispatch engine.
//!
//! ## Layout
//! ```text
//! period    "2 days" → chrono::Duration
//! location  raw venue address → line1 / city-state-zip / map link
//! message   start instant + timezone → reminder sentence
//! types     Session, Participant, Attendee, DispatchRequest
//! traits    SessionStore, SmsSender, Shortener, MessageRenderer
//! config    TOML configuration (~/.remindr/config.toml)
//! ```

pub mod config;
pub mod error;
pub mod location;
pub mod message;
pub mod period;
pub mod traits;
pub mod types;

pub use error::{RemindError, Result};
pub use traits::{MessageRenderer, SessionStore, Shortener, SmsSender};
pub use types::{Attendee, DispatchRequest, JobArgs, Location, LocationType, Participant, Session, Venue};
