//! # Remindr Channels
//! Production implementations of the collaborators the dispatcher consumes.
//!
//! - `twilio`    SMS transport (Twilio Messaging API)
//! - `shortener` link-shortening service client
//! - `renderer`  long info-page URL for a participant

pub mod renderer;
pub mod shortener;
pub mod twilio;

pub use renderer::InfoLinkRenderer;
pub use shortener::LinkShortener;
pub use twilio::TwilioSender;
