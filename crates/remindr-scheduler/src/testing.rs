//! In-process fakes for the dispatcher's collaborators.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::{MessageRenderer, SessionStore, Shortener, SmsSender};
use remindr_core::types::{Attendee, LocationType, Participant, Session, Venue};

pub fn participant(i: usize) -> Participant {
    Participant {
        first_name: format!("First{i}"),
        last_name: format!("Last{i}"),
        full_name: format!("First{i} Last{i}"),
        phone: format!("(504) 555-{:04}", i),
        email: format!("p{i}@example.org"),
        join_url: None,
    }
}

/// Normalized number [`RecordingSender`] produces for `participant(i)`.
pub fn cell(i: usize) -> String {
    format!("+1504555{:04}", i)
}

pub fn session_starting(id: &str, start: DateTime<Utc>, participants: usize) -> Session {
    Session {
        id: id.to_string(),
        program_id: "info-session".into(),
        start,
        location_id: "hq".into(),
        location_type: LocationType::InPerson,
        participants: (0..participants).map(participant).collect(),
        venue: Some(Venue {
            name: "Operation Spark".into(),
            address: "514 Franklin Ave, New Orleans, LA 70117, USA".into(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// SMS sender that records every attempt and fails for selected numbers.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail sends addressed to any of these normalized numbers.
    pub fn failing_for<I: IntoIterator<Item = String>>(numbers: I) -> Self {
        Self {
            failing: numbers.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sleep this long inside every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Most sends observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmsSender for RecordingSender {
    fn name(&self) -> &str { "recording" }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(to) {
            return Err(RemindError::Channel(format!("carrier rejected {to}")));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage {
                to: to.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }

    fn format_cell(&self, raw: &str) -> String {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return String::new();
        }
        format!("+1{digits}")
    }
}

/// Shortener that fails for URLs containing any of the given fragments.
#[derive(Default)]
pub struct StubShortener {
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl StubShortener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I: IntoIterator<Item = String>>(fragments: I) -> Self {
        Self {
            failing: fragments.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Shortener for StubShortener {
    async fn shorten(&self, long_url: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| long_url.contains(f.as_str())) {
            return Err(RemindError::Shorten("shortener unavailable".into()));
        }
        Ok(format!("https://short.test/{n}"))
    }
}

/// Renderer producing `https://info.test/m/{email}`; fails for selected emails.
#[derive(Default)]
pub struct StubRenderer {
    failing: HashSet<String>,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I: IntoIterator<Item = String>>(emails: I) -> Self {
        Self {
            failing: emails.into_iter().collect(),
        }
    }
}

#[async_trait]
impl MessageRenderer for StubRenderer {
    async fn message_url(&self, attendee: &Attendee) -> Result<String> {
        let email = &attendee.participant.email;
        if self.failing.contains(email) {
            return Err(RemindError::Render(format!("cannot render link for {email}")));
        }
        Ok(format!("https://info.test/m/{email}"))
    }
}

/// Store whose every query fails.
pub struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn upcoming_sessions(&self, _window: chrono::Duration) -> Result<Vec<Session>> {
        Err(RemindError::StoreQuery("connection refused".into()))
    }
}
