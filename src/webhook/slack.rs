//! Slack incoming-webhook sink
//!
//! Posts each event as `{"event_data": "<indented JSON>"}` so a Slack
//! workflow can reference the whole event as one variable.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::EventSink;
use crate::event::SecurityEvent;
use crate::utils::DeliveryError;

/// Slack webhook message payload
#[derive(Debug, Serialize)]
pub struct WebhookMessage {
    /// Event rendered as indented JSON text
    pub event_data: String,
}

impl WebhookMessage {
    /// Build the payload for an (already redacted) event
    pub fn from_event(event: &SecurityEvent) -> Result<Self, DeliveryError> {
        let event_data = event
            .to_pretty_json()
            .map_err(|e| DeliveryError::Serialize {
                event_id: event.id(),
                reason: e.to_string(),
            })?;

        Ok(Self { event_data })
    }
}

/// Slack webhook delivery service
#[derive(Debug, Clone)]
pub struct SlackWebhook {
    /// Webhook URL
    webhook_url: String,
    /// HTTP client
    client: Client,
}

impl SlackWebhook {
    /// Create a new webhook sink with a default client
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self::with_client(webhook_url, Client::new())
    }

    /// Create a new webhook sink sharing an existing client
    pub fn with_client(webhook_url: impl Into<String>, client: Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client,
        }
    }

    /// Send a payload to the webhook.
    ///
    /// Only transport failures are errors. The response body is not read and
    /// a non-2xx status is logged but still counts as delivered.
    async fn send_payload(&self, payload: &WebhookMessage) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Webhook answered with non-success status");
        }

        Ok(())
    }
}

#[async_trait]
impl EventSink for SlackWebhook {
    #[instrument(skip(self, event), fields(event_id = event.id()))]
    async fn deliver(&self, event: &SecurityEvent) -> Result<(), DeliveryError> {
        let payload = WebhookMessage::from_event(event)?;
        debug!(bytes = payload.event_data.len(), "Posting event to webhook");
        self.send_payload(&payload).await?;

        info!("Event sent to webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> SecurityEvent {
        SecurityEvent::from_value(json!({"id": 5, "type": "Y"})).expect("valid event")
    }

    #[test]
    fn should_wrap_event_as_indented_text() {
        // Arrange
        let event = sample_event();

        // Act
        let message = WebhookMessage::from_event(&event).expect("payload");
        let json = serde_json::to_value(&message).expect("Failed to serialize");

        // Assert
        assert_eq!(
            json,
            json!({"event_data": "{\n    \"id\": 5,\n    \"type\": \"Y\"\n}"})
        );
    }

    #[tokio::test]
    async fn should_fail_with_transport_error_for_invalid_url() {
        // Arrange
        let webhook = SlackWebhook::new("invalid-url");

        // Act
        let result = webhook.deliver(&sample_event()).await;

        // Assert
        match result {
            Err(DeliveryError::Transport(_)) => {}
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }
}
