//! Error type shared by every Remindr crate.

/// Errors raised while resolving, composing, or delivering reminders.
#[derive(Debug, thiserror::Error)]
pub enum RemindError {
    /// Malformed lookahead period (the magnitude is not an integer).
    #[error("invalid period \"{period}\": {reason}")]
    Parse { period: String, reason: String },

    /// Lookahead period uses a unit other than days, hours, or minutes.
    #[error("unsupported period unit in \"{0}\": expected days, hours, or minutes")]
    UnsupportedUnit(String),

    #[error("no timezone available to format the session time")]
    MissingTimezone,

    #[error("session store query failed: {0}")]
    StoreQuery(String),

    #[error("no upcoming sessions in the next {period}")]
    NoUpcomingSessions { period: String },

    /// A single participant's pipeline failed (URL rendering or transport).
    #[error("delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },

    #[error("message URL rendering failed: {0}")]
    Render(String),

    #[error("link shortening failed: {0}")]
    Shorten(String),

    #[error("SMS channel error: {0}")]
    Channel(String),

    #[error("{0} timed out")]
    Timeout(String),

    #[error("dispatch cancelled before it started")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemindError {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::UnsupportedUnit(_))
    }
}

pub type Result<T> = std::result::Result<T, RemindError>;
