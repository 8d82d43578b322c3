//! Capabilities the dispatch engine consumes.
//!
//! Every implementation is shared across concurrently running delivery tasks,
//! so all of them must be safe to call from many tasks at once.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::Result;
use crate::types::{Attendee, Session};

/// Source of upcoming sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Sessions starting in `[now, now + window]`, participants and venue attached.
    async fn upcoming_sessions(&self, window: Duration) -> Result<Vec<Session>>;
}

/// Outbound SMS transport.
#[async_trait]
pub trait SmsSender: Send + Sync {
    fn name(&self) -> &str;

    /// Send `body` to an already normalized recipient number.
    async fn send(&self, to: &str, body: &str) -> Result<()>;

    /// Normalize a stored phone number into the format `send` expects.
    fn format_cell(&self, raw: &str) -> String;
}

/// Link-shortening service.
#[async_trait]
pub trait Shortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> Result<String>;
}

/// Builds the long informational URL a reminder links to.
#[async_trait]
pub trait MessageRenderer: Send + Sync {
    async fn message_url(&self, attendee: &Attendee) -> Result<String>;
}
