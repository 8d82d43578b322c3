//! Twilio Programmable Messaging channel.
//!
//! Sends plain SMS through the REST API:
//! `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json` (form-encoded, basic auth).

use async_trait::async_trait;
use remindr_core::config::TwilioConfig;
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::SmsSender;
use serde::Deserialize;

/// Error payload Twilio returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// Twilio SMS sender. Stateless; one instance is shared by every delivery task.
pub struct TwilioSender {
    config: TwilioConfig,
    client: reqwest::Client,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn check_config(&self) -> Result<()> {
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(RemindError::Config("Twilio account_sid/auth_token not configured".into()));
        }
        if self.config.from_number.is_empty() {
            return Err(RemindError::Config("Twilio from_number not configured".into()));
        }
        Ok(())
    }
}

/// Normalize a US phone number to E.164.
///
/// Formatting characters are dropped; a bare 10-digit number gets the `+1` country code.
pub fn format_cell(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0 => String::new(),
        10 => format!("+1{digits}"),
        _ => format!("+{digits}"),
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    fn name(&self) -> &str { "twilio" }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.check_config()?;

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("To", to), ("From", self.config.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| RemindError::Channel(format!("Twilio request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TwilioError>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("{} (code {code})", err.message),
                    None => err.message,
                },
                Err(_) => text,
            };
            return Err(RemindError::Channel(format!("Twilio API error {status}: {detail}")));
        }

        tracing::debug!("Twilio SMS accepted → {}", to);
        Ok(())
    }

    fn format_cell(&self, raw: &str) -> String {
        format_cell(raw)
    }
}
