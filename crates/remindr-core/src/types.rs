//! Data model shared between the store, the dispatcher, and the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a session is attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    InPerson,
    Virtual,
    Hybrid,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::InPerson => "IN_PERSON",
            LocationType::Virtual => "VIRTUAL",
            LocationType::Hybrid => "HYBRID",
        }
    }
}

impl std::fmt::Display for LocationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PERSON" => Ok(LocationType::InPerson),
            "VIRTUAL" => Ok(LocationType::Virtual),
            "HYBRID" => Ok(LocationType::Hybrid),
            other => Err(format!("unknown location type: {other}")),
        }
    }
}

/// A place record as the store keeps it: a name and a free-form address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    #[serde(default)]
    pub address: String,
}

/// Display-ready location derived from a [`Venue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub line1: String,
    pub city_state_zip: String,
    pub map_url: String,
}

/// Someone registered for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    /// Phone number as stored; normalized by the SMS channel before sending.
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub join_url: Option<String>,
}

/// A scheduled info session with its registered participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub program_id: String,
    pub start: DateTime<Utc>,
    pub location_id: String,
    pub location_type: LocationType,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Venue resolved from `location_id` by the store, if any.
    #[serde(default)]
    pub venue: Option<Venue>,
}

/// A participant carrying everything its reminder needs from the session.
/// Built once per session before fan-out and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(flatten)]
    pub participant: Participant,
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    pub location_type: LocationType,
    pub location: Location,
}

impl Attendee {
    /// Name used in logs and error reports.
    pub fn display_name(&self) -> String {
        if !self.participant.full_name.is_empty() {
            return self.participant.full_name.clone();
        }
        format!("{} {}", self.participant.first_name, self.participant.last_name)
            .trim()
            .to_string()
    }
}

/// Body of the inbound notify request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub job_name: String,
    pub job_args: JobArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobArgs {
    pub period: String,
    #[serde(default)]
    pub dry_run: bool,
}
