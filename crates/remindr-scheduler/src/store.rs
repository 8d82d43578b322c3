//! In-memory session store, plus the window rule every store follows.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::SessionStore;
use remindr_core::types::Session;
use tokio::sync::RwLock;

/// `now + window`, or a store error if that falls off the calendar.
pub fn window_end(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(window).ok_or_else(|| {
        RemindError::StoreQuery(format!(
            "lookahead window of {}s is out of range",
            window.num_seconds()
        ))
    })
}

/// True if `start` lies in `[now, end]`, both ends inclusive.
pub fn in_window(start: DateTime<Utc>, now: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start >= now && start <= end
}

/// Sessions held in memory. Useful for one-off runs fed from a JSON file and for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<Vec<Session>>,
}

impl MemorySessionStore {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: RwLock::new(sessions),
        }
    }

    pub async fn insert(&self, session: Session) {
        self.sessions.write().await.push(session);
    }

    /// Sessions upcoming relative to an explicit `now`.
    pub async fn upcoming_at(&self, now: DateTime<Utc>, window: Duration) -> Result<Vec<Session>> {
        let end = window_end(now, window)?;
        let mut upcoming: Vec<Session> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| in_window(s.start, now, end))
            .cloned()
            .collect();
        upcoming.sort_by_key(|s| s.start);
        Ok(upcoming)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn upcoming_sessions(&self, window: Duration) -> Result<Vec<Session>> {
        self.upcoming_at(Utc::now(), window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_starting;

    #[test]
    fn test_window_is_inclusive() {
        let now = Utc::now();
        let end = window_end(now, Duration::days(1)).unwrap();
        assert!(in_window(now, now, end));
        assert!(in_window(end, now, end));
        assert!(!in_window(now - Duration::milliseconds(1), now, end));
        assert!(!in_window(end + Duration::seconds(1), now, end));
    }

    #[tokio::test]
    async fn test_upcoming_filters_and_sorts() {
        let now = Utc::now();
        let store = MemorySessionStore::new(vec![
            session_starting("late", now + Duration::hours(20), 1),
            session_starting("past", now - Duration::hours(1), 1),
            session_starting("soon", now + Duration::hours(2), 1),
            session_starting("next-week", now + Duration::days(7), 1),
        ]);

        let ids: Vec<String> = store
            .upcoming_at(now, Duration::days(1))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["soon", "late"]);
    }

    #[tokio::test]
    async fn test_insert() {
        let store = MemorySessionStore::default();
        store
            .insert(session_starting("s1", Utc::now() + Duration::hours(1), 2))
            .await;
        let sessions = store.upcoming_sessions(Duration::hours(2)).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].participants.len(), 2);
    }

    #[tokio::test]
    async fn test_window_past_the_calendar_is_a_store_error() {
        let store = MemorySessionStore::new(vec![session_starting("s1", Utc::now(), 1)]);
        let err = store
            .upcoming_at(Utc::now(), Duration::days(100_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, RemindError::StoreQuery(_)));
    }
}
