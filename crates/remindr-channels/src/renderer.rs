//! Info-page link rendering.
//!
//! The info page is static and reads everything it shows from the URL itself:
//! `{base_url}/m/{token}`, where the token is the attendee summary as
//! base64url-encoded JSON.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use remindr_core::config::RendererConfig;
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::MessageRenderer;
use remindr_core::types::{Attendee, Location, LocationType};
use serde::{Deserialize, Serialize};

/// What the info page needs to display one attendee's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cell: String,
    pub session_id: String,
    pub session_date: DateTime<Utc>,
    pub location_type: LocationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_url: Option<String>,
    pub location: Location,
}

impl From<&Attendee> for InfoPayload {
    fn from(a: &Attendee) -> Self {
        Self {
            first_name: a.participant.first_name.clone(),
            last_name: a.participant.last_name.clone(),
            email: a.participant.email.clone(),
            cell: a.participant.phone.clone(),
            session_id: a.session_id.clone(),
            session_date: a.session_start,
            location_type: a.location_type,
            join_url: a.participant.join_url.clone(),
            location: a.location.clone(),
        }
    }
}

impl InfoPayload {
    /// Decode a token produced by [`InfoLinkRenderer`].
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| RemindError::Render(format!("invalid token: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub struct InfoLinkRenderer {
    base_url: String,
}

impl InfoLinkRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn render(&self, attendee: &Attendee) -> Result<String> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(RemindError::Render(format!(
                "renderer base_url '{}' is not an http(s) URL",
                self.base_url
            )));
        }
        let json = serde_json::to_vec(&InfoPayload::from(attendee))?;
        Ok(format!("{}/m/{}", self.base_url, URL_SAFE_NO_PAD.encode(json)))
    }
}

#[async_trait]
impl MessageRenderer for InfoLinkRenderer {
    async fn message_url(&self, attendee: &Attendee) -> Result<String> {
        self.render(attendee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use remindr_core::types::Participant;

    fn attendee() -> Attendee {
        Attendee {
            participant: Participant {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                full_name: "Grace Hopper".into(),
                phone: "504-555-1234".into(),
                email: "grace@example.org".into(),
                join_url: Some("https://zoom.us/j/123".into()),
            },
            session_id: "sess-1".into(),
            session_start: Utc.with_ymd_and_hms(2026, 3, 2, 21, 0, 0).unwrap(),
            location_type: LocationType::Hybrid,
            location: Location {
                name: "HQ".into(),
                line1: "514 Franklin Ave".into(),
                city_state_zip: "New Orleans, LA 70117".into(),
                map_url: "https://www.google.com/maps/place/x".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_message_url_round_trip() {
        let renderer = InfoLinkRenderer::new(RendererConfig {
            base_url: "https://info.example.org/".into(),
        });
        let url = renderer.message_url(&attendee()).await.unwrap();
        let token = url.strip_prefix("https://info.example.org/m/").unwrap();
        assert!(!token.contains('/') && !token.contains('+') && !token.contains('='));

        let payload = InfoPayload::decode(token).unwrap();
        assert_eq!(payload, InfoPayload::from(&attendee()));
        assert_eq!(payload.join_url.as_deref(), Some("https://zoom.us/j/123"));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let renderer = InfoLinkRenderer::new(RendererConfig { base_url: String::new() });
        let err = renderer.message_url(&attendee()).await.unwrap_err();
        assert!(matches!(err, RemindError::Render(_)));
    }
}
