//! Webhook delivery for redacted events

pub mod slack;

use async_trait::async_trait;

use crate::event::SecurityEvent;
use crate::utils::DeliveryError;

pub use slack::{SlackWebhook, WebhookMessage};

/// Write side of the relay: hands one event to an external endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &SecurityEvent) -> Result<(), DeliveryError>;
}
