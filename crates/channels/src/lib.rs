//! Channel sender adapters.
//!
//! One adapter per delivery channel, all behind the `ChannelSender` trait so
//! the coordinator can hold them in a per-channel strategy table. Adapters
//! return errors instead of panicking; the coordinator decides how to react.

pub mod email;
pub mod slack;
pub mod sms;

use async_trait::async_trait;

use courier_common::error::AppError;
use courier_common::types::{OutboundMessage, ProviderResponse};

pub use email::EmailSender;
pub use slack::SlackSender;
pub use sms::SmsSender;

/// Deliver a fully-addressed message over one channel.
///
/// Implementations own provider-specific request construction (endpoint,
/// auth, test-mode redirect). The returned `ProviderResponse` carries the
/// provider's raw status/body string for logging.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, AppError>;
}
