//! SQLite-backed session store.
//! Sessions, their participants, and venues live in three tables joined per query.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::SessionStore;
use remindr_core::types::{LocationType, Participant, Session, Venue};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;

use crate::store::window_end;

/// A venue as it appears in an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
}

/// Import file layout: `{"venues": [...], "sessions": [...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct ImportFile {
    #[serde(default)]
    pub venues: Vec<VenueRecord>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Counts written by [`SessionDb::import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub venues: usize,
    pub sessions: usize,
    pub participants: usize,
}

pub struct SessionDb {
    conn: Mutex<Connection>,
}

impl SessionDb {
    /// Open or create the database. `":memory:"` gives a throwaway store.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err("open"))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err("open"))?;
        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RemindError::StoreQuery(format!("lock poisoned: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS locations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                program_id TEXT NOT NULL,
                start_ms INTEGER NOT NULL,       -- unix milliseconds, UTC
                location_id TEXT NOT NULL DEFAULT '',
                location_type TEXT NOT NULL      -- 'IN_PERSON', 'VIRTUAL', 'HYBRID'
            );

            CREATE TABLE IF NOT EXISTS participants (
                session_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                full_name TEXT NOT NULL DEFAULT '',
                phone TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                join_url TEXT,
                PRIMARY KEY (session_id, seq),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_ms);
            ",
            )
            .map_err(store_err("migrate"))
    }

    pub fn save_location(&self, id: &str, venue: &Venue) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO locations (id, name, address) VALUES (?1, ?2, ?3)",
                params![id, venue.name, venue.address],
            )
            .map_err(store_err("save location"))?;
        Ok(())
    }

    /// Insert or replace a session and its participant list. The session's
    /// `venue` is ignored; venues are saved separately and joined on read.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(store_err("begin"))?;
        tx.execute(
            "INSERT OR REPLACE INTO sessions (id, program_id, start_ms, location_id, location_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.program_id,
                session.start.timestamp_millis(),
                session.location_id,
                session.location_type.as_str(),
            ],
        )
        .map_err(store_err("save session"))?;
        tx.execute("DELETE FROM participants WHERE session_id = ?1", params![session.id])
            .map_err(store_err("clear participants"))?;
        for (seq, p) in session.participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO participants (session_id, seq, first_name, last_name, full_name, phone, email, join_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id,
                    seq as i64,
                    p.first_name,
                    p.last_name,
                    p.full_name,
                    p.phone,
                    p.email,
                    p.join_url,
                ],
            )
            .map_err(store_err("save participant"))?;
        }
        tx.commit().map_err(store_err("commit"))
    }

    /// Load venues and sessions from an import file's JSON text.
    pub fn import(&self, json: &str) -> Result<ImportSummary> {
        let file: ImportFile = serde_json::from_str(json)?;
        let mut summary = ImportSummary::default();
        for v in &file.venues {
            self.save_location(
                &v.id,
                &Venue {
                    name: v.name.clone(),
                    address: v.address.clone(),
                },
            )?;
            summary.venues += 1;
        }
        for s in &file.sessions {
            // An inline venue on the session doubles as its location record.
            if let Some(venue) = &s.venue {
                self.save_location(&s.location_id, venue)?;
            }
            self.save_session(s)?;
            summary.sessions += 1;
            summary.participants += s.participants.len();
        }
        tracing::info!(
            venues = summary.venues,
            sessions = summary.sessions,
            participants = summary.participants,
            "📥 Imported sessions"
        );
        Ok(summary)
    }

    /// Sessions starting in `[now, now + window]`, with participants and venue, ordered by start.
    pub fn upcoming_sessions_at(&self, now: DateTime<Utc>, window: Duration) -> Result<Vec<Session>> {
        let from = now.timestamp_millis();
        let to = window_end(now, window)?.timestamp_millis();
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT s.id, s.program_id, s.start_ms, s.location_id, s.location_type, l.name, l.address
                 FROM sessions s LEFT JOIN locations l ON l.id = s.location_id
                 WHERE s.start_ms >= ?1 AND s.start_ms <= ?2
                 ORDER BY s.start_ms",
            )
            .map_err(store_err("prepare"))?;
        let rows = stmt
            .query_map(params![from, to], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .map_err(store_err("query sessions"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err("read sessions"))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for (id, program_id, start_ms, location_id, location_type, venue_name, venue_address) in rows {
            let start = DateTime::from_timestamp_millis(start_ms)
                .ok_or_else(|| RemindError::StoreQuery(format!("session {id} has invalid start {start_ms}")))?;
            let location_type: LocationType = location_type.parse().map_err(RemindError::StoreQuery)?;
            let venue = venue_name.map(|name| Venue {
                name,
                address: venue_address.unwrap_or_default(),
            });
            let participants = load_participants(&conn, &id)?;
            sessions.push(Session {
                id,
                program_id,
                start,
                location_id,
                location_type,
                participants,
                venue,
            });
        }
        tracing::debug!(count = sessions.len(), window_secs = window.num_seconds(), "Queried upcoming sessions");
        Ok(sessions)
    }

    pub fn session_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(store_err("count"))?;
        Ok(n as usize)
    }

    pub fn location(&self, id: &str) -> Result<Option<Venue>> {
        self.conn()?
            .query_row(
                "SELECT name, address FROM locations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Venue {
                        name: row.get(0)?,
                        address: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(store_err("load location"))
    }
}

fn load_participants(conn: &Connection, session_id: &str) -> Result<Vec<Participant>> {
    let mut stmt = conn
        .prepare(
            "SELECT first_name, last_name, full_name, phone, email, join_url
             FROM participants WHERE session_id = ?1 ORDER BY seq",
        )
        .map_err(store_err("prepare"))?;
    stmt.query_map(params![session_id], |row| {
        Ok(Participant {
            first_name: row.get(0)?,
            last_name: row.get(1)?,
            full_name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            join_url: row.get(5)?,
        })
    })
    .map_err(store_err("query participants"))?
    .collect::<std::result::Result<Vec<_>, _>>()
    .map_err(store_err("read participants"))
}

fn store_err(op: &'static str) -> impl Fn(rusqlite::Error) -> RemindError {
    move |e| RemindError::StoreQuery(format!("{op}: {e}"))
}

#[async_trait]
impl SessionStore for SessionDb {
    async fn upcoming_sessions(&self, window: Duration) -> Result<Vec<Session>> {
        self.upcoming_sessions_at(Utc::now(), window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session_starting;
    use chrono::TimeZone;

    fn db() -> SessionDb {
        SessionDb::in_memory().unwrap()
    }

    #[test]
    fn test_open_and_migrate() {
        let path = std::env::temp_dir().join(format!("remindr-test-{}.db", uuid::Uuid::new_v4()));
        let db = SessionDb::open(&path).unwrap();
        assert_eq!(db.session_count().unwrap(), 0);
        drop(db);
        // Reopening runs the migration again against existing tables.
        let db = SessionDb::open(&path).unwrap();
        assert_eq!(db.session_count().unwrap(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_save_and_query_joins_venue_and_participants() {
        let db = db();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let session = session_starting("s1", now + Duration::hours(3), 2);
        db.save_location("hq", session.venue.as_ref().unwrap()).unwrap();
        db.save_session(&session).unwrap();

        let found = db.upcoming_sessions_at(now, Duration::days(1)).unwrap();
        assert_eq!(found.len(), 1);
        let s = &found[0];
        assert_eq!(s.start, now + Duration::hours(3));
        assert_eq!(s.location_type, LocationType::InPerson);
        assert_eq!(s.participants, session.participants);
        assert_eq!(s.venue.as_ref().unwrap().address, "514 Franklin Ave, New Orleans, LA 70117, USA");
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let db = db();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        for (id, offset) in [("before", -1), ("at-now", 0), ("at-end", 3600), ("after", 3601)] {
            db.save_session(&session_starting(id, now + Duration::seconds(offset), 1))
                .unwrap();
        }

        let ids: Vec<String> = db
            .upcoming_sessions_at(now, Duration::hours(1))
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["at-now", "at-end"]);
    }

    #[test]
    fn test_missing_venue_yields_none() {
        let db = db();
        let now = Utc::now();
        db.save_session(&session_starting("s1", now + Duration::hours(1), 1))
            .unwrap();
        let found = db.upcoming_sessions_at(now, Duration::hours(2)).unwrap();
        assert!(found[0].venue.is_none());
    }

    #[test]
    fn test_resave_replaces_participants() {
        let db = db();
        let now = Utc::now();
        db.save_session(&session_starting("s1", now + Duration::hours(1), 4))
            .unwrap();
        db.save_session(&session_starting("s1", now + Duration::hours(1), 2))
            .unwrap();
        let found = db.upcoming_sessions_at(now, Duration::hours(2)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].participants.len(), 2);
    }

    #[test]
    fn test_import() {
        let db = db();
        let json = r#"{
            "venues": [{"id": "hq", "name": "Operation Spark", "address": "514 Franklin Ave, New Orleans, LA 70117"}],
            "sessions": [{
                "id": "s1",
                "programId": "info-session",
                "start": "2099-01-05T23:00:00Z",
                "locationId": "hq",
                "locationType": "HYBRID",
                "participants": [
                    {"firstName": "Ada", "lastName": "Lovelace", "phone": "504-555-0100"},
                    {"firstName": "Alan", "lastName": "Turing", "phone": "504-555-0101", "joinUrl": "https://zoom.test/1"}
                ]
            }]
        }"#;

        let summary = db.import(json).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                venues: 1,
                sessions: 1,
                participants: 2
            }
        );
        assert_eq!(db.location("hq").unwrap().unwrap().name, "Operation Spark");

        let now = Utc.with_ymd_and_hms(2099, 1, 5, 0, 0, 0).unwrap();
        let found = db.upcoming_sessions_at(now, Duration::days(1)).unwrap();
        assert_eq!(found[0].location_type, LocationType::Hybrid);
        assert_eq!(found[0].participants[1].join_url.as_deref(), Some("https://zoom.test/1"));
    }

    #[test]
    fn test_import_rejects_bad_json() {
        let err = db().import("{not json").unwrap_err();
        assert!(matches!(err, RemindError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_session_store_impl() {
        let db = db();
        db.save_session(&session_starting("s1", Utc::now() + Duration::minutes(30), 3))
            .unwrap();
        let sessions = db.upcoming_sessions(Duration::hours(1)).await.unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_window_past_the_calendar_is_a_store_error() {
        let db = db();
        db.save_session(&session_starting("s1", Utc::now() + Duration::hours(1), 1))
            .unwrap();
        let err = db
            .upcoming_sessions_at(Utc::now(), Duration::days(100_000_000))
            .unwrap_err();
        assert!(matches!(err, RemindError::StoreQuery(_)));
    }

    #[test]
    fn test_sub_second_start_is_kept() {
        let db = db();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let just_started = now - Duration::milliseconds(300);
        let upcoming = now + Duration::milliseconds(250);
        db.save_session(&session_starting("started", just_started, 1)).unwrap();
        db.save_session(&session_starting("upcoming", upcoming, 1)).unwrap();

        let found = db.upcoming_sessions_at(now, Duration::hours(1)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "upcoming");
        assert_eq!(found[0].start, upcoming);
    }
}
