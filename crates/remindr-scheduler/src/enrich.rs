//! Session → attendee enrichment.

use remindr_core::types::{Attendee, Location, Session};

/// Copy session context onto each participant. The location is transformed once per session.
pub fn enrich_session(session: &Session) -> Vec<Attendee> {
    let location = session
        .venue
        .as_ref()
        .map(Location::from_venue)
        .unwrap_or_default();

    session
        .participants
        .iter()
        .map(|p| Attendee {
            participant: p.clone(),
            session_id: session.id.clone(),
            session_start: session.start,
            location_type: session.location_type,
            location: location.clone(),
        })
        .collect()
}

/// Enrich every session, flattening into one work list.
pub fn enrich_all(sessions: &[Session]) -> Vec<Attendee> {
    sessions.iter().flat_map(enrich_session).collect()
}
