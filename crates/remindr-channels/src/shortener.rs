//! URL shortener client.
//!
//! `POST {api_base}/api/urls` with `{"originalUrl": ...}` and the API key in a
//! `key` header; the service answers `{"shortUrl": ...}`.

use async_trait::async_trait;
use remindr_core::config::ShortenerConfig;
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::Shortener;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShortenRequest<'a> {
    original_url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortenResponse {
    #[serde(default)]
    short_url: String,
}

pub struct LinkShortener {
    config: ShortenerConfig,
    client: reqwest::Client,
}

impl LinkShortener {
    pub fn new(config: ShortenerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Shortener for LinkShortener {
    async fn shorten(&self, long_url: &str) -> Result<String> {
        let url = format!("{}/api/urls", self.config.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("key", &self.config.api_key)
            .json(&ShortenRequest { original_url: long_url })
            .send()
            .await
            .map_err(|e| RemindError::Shorten(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemindError::Shorten(format!("API error {status}: {body}")));
        }

        let parsed: ShortenResponse = response
            .json()
            .await
            .map_err(|e| RemindError::Shorten(format!("invalid response: {e}")))?;

        if parsed.short_url.is_empty() {
            return Err(RemindError::Shorten("response did not include a short URL".into()));
        }
        Ok(parsed.short_url)
    }
}
