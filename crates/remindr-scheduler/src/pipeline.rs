//! Per-participant delivery: render → shorten → compose → normalize → send.

use std::sync::Arc;
use std::time::Duration;

use remindr_core::config::DispatchConfig;
use remindr_core::error::{RemindError, Result};
use remindr_core::traits::{MessageRenderer, Shortener, SmsSender};
use remindr_core::types::Attendee;
use tokio::time::timeout;

/// Deadlines for the calls a single delivery makes.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    /// Rendering and shortening, each.
    pub link: Duration,
    pub send: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            link: Duration::from_secs(10),
            send: Duration::from_secs(10),
        }
    }
}

impl From<&DispatchConfig> for PipelineTimeouts {
    fn from(cfg: &DispatchConfig) -> Self {
        Self {
            link: Duration::from_secs(cfg.link_timeout_secs),
            send: Duration::from_secs(cfg.send_timeout_secs),
        }
    }
}

/// Result of one successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub dry_run: bool,
    /// False when the shortener failed and the long URL went out instead.
    pub shortened: bool,
}

/// The per-participant steps, sharing one set of clients across all tasks.
pub struct DeliveryPipeline {
    sender: Arc<dyn SmsSender>,
    shortener: Arc<dyn Shortener>,
    renderer: Arc<dyn MessageRenderer>,
    timeouts: PipelineTimeouts,
}

impl DeliveryPipeline {
    pub fn new(
        sender: Arc<dyn SmsSender>,
        shortener: Arc<dyn Shortener>,
        renderer: Arc<dyn MessageRenderer>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            sender,
            shortener,
            renderer,
            timeouts,
        }
    }

    /// Deliver `reminder` plus an info link to one attendee.
    ///
    /// Rendering and sending failures fail the delivery. A shortener failure
    /// only downgrades the link to the long URL.
    pub async fn deliver(&self, attendee: &Attendee, reminder: &str, dry_run: bool) -> Result<DeliveryOutcome> {
        let who = attendee.display_name();

        let long_url = match timeout(self.timeouts.link, self.renderer.message_url(attendee)).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => return Err(delivery_error(&who, e)),
            Err(_) => return Err(delivery_error(&who, RemindError::Timeout("message URL rendering".into()))),
        };

        let (link, shortened) = match timeout(self.timeouts.link, self.shortener.shorten(&long_url)).await {
            Ok(Ok(short)) => (short, true),
            Ok(Err(e)) => {
                tracing::warn!(participant = %who, "⚠️ {e}; sending the long URL instead");
                (long_url, false)
            }
            Err(_) => {
                tracing::warn!(participant = %who, "⚠️ link shortening timed out; sending the long URL instead");
                (long_url, false)
            }
        };

        let body = format!("{reminder}\nMore details: {link}");
        let to = self.sender.format_cell(&attendee.participant.phone);

        if dry_run {
            if to.is_empty() {
                tracing::warn!(participant = %who, "⚠️ Dry run: no usable phone number, a real run would fail here");
            }
            tracing::info!(recipient = %to, participant = %who, "🧪 Dry run, SMS not sent:\n{body}");
            return Ok(DeliveryOutcome {
                recipient: to,
                dry_run: true,
                shortened,
            });
        }

        if to.is_empty() {
            return Err(delivery_error(&who, RemindError::Channel("participant has no phone number".into())));
        }

        match timeout(self.timeouts.send, self.sender.send(&to, &body)).await {
            Ok(Ok(())) => {
                tracing::info!(recipient = %to, via = self.sender.name(), "✅ Reminder sent");
                Ok(DeliveryOutcome {
                    recipient: to,
                    dry_run: false,
                    shortened,
                })
            }
            Ok(Err(e)) => Err(delivery_error(&to, e)),
            Err(_) => Err(delivery_error(&to, RemindError::Timeout("SMS send".into()))),
        }
    }
}

fn delivery_error(recipient: &str, cause: RemindError) -> RemindError {
    RemindError::Delivery {
        recipient: recipient.to_string(),
        reason: cause.to_string(),
    }
}
