//! Remindr configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use crate::error::{RemindError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindrConfig {
    /// IANA timezone sessions are announced in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub shortener: ShortenerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_timezone() -> String { "America/Chicago".into() }

impl Default for RemindrConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            gateway: GatewayConfig::default(),
            dispatch: DispatchConfig::default(),
            twilio: TwilioConfig::default(),
            shortener: ShortenerConfig::default(),
            renderer: RendererConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl RemindrConfig {
    /// Load config from the default path (~/.remindr/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RemindError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RemindError::Config(format!("Failed to parse config: {e}")))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Fill secrets from the process environment. Called once at startup;
    /// nothing downstream reads the environment.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.twilio.account_sid, "TWILIO_ACCOUNT_SID");
        set(&mut self.twilio.auth_token, "TWILIO_AUTH_TOKEN");
        set(&mut self.twilio.from_number, "TWILIO_PHONE_NUMBER");
        set(&mut self.shortener.api_key, "URL_SHORTENER_API_KEY");
    }

    /// Resolve the configured timezone name.
    pub fn resolve_timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| RemindError::Config(format!("Unknown timezone '{}': {e}", self.timezone)))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Remindr home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".remindr")
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 8080 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Fan-out and timeout tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Deadline for a single SMS send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Deadline for rendering or shortening one link.
    #[serde(default = "default_link_timeout")]
    pub link_timeout_secs: u64,
    /// Deadline for one participant's whole pipeline.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// Cap on simultaneously running deliveries. Unset means unbounded.
    #[serde(default)]
    pub max_concurrent: Option<usize>,
}

fn default_send_timeout() -> u64 { 10 }
fn default_link_timeout() -> u64 { 10 }
fn default_task_timeout() -> u64 { 30 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout(),
            link_timeout_secs: default_link_timeout(),
            task_timeout_secs: default_task_timeout(),
            max_concurrent: None,
        }
    }
}

/// Twilio Messaging API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sender number in E.164 form.
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
}

fn default_twilio_api_base() -> String { "https://api.twilio.com".into() }

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_twilio_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    #[serde(default = "default_shortener_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_shortener_api_base() -> String { "https://ospk.org".into() }

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            api_base: default_shortener_api_base(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Base URL of the session info page.
    #[serde(default = "default_renderer_base_url")]
    pub base_url: String,
}

fn default_renderer_base_url() -> String { "https://sms.operationspark.org".into() }

impl Default for RendererConfig {
    fn default() -> Self {
        Self { base_url: default_renderer_base_url() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String { "~/.remindr/sessions.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}
