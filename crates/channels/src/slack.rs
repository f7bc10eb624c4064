//! Slack delivery via the Web API (`chat.postMessage`).
//!
//! Messages go directly to a named user. Slack reports most failures inside a
//! 200 response (`"ok": false`), so the body is inspected as well as the
//! HTTP status.

use async_trait::async_trait;
use serde_json::json;

use courier_common::error::AppError;
use courier_common::types::{OutboundMessage, ProviderResponse};

use crate::ChannelSender;

const SLACK_ENDPOINT: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackSender {
    http: reqwest::Client,
    bot_token: String,
    /// When set, replaces the real recipient handle (test mode).
    test_redirect: Option<String>,
}

impl SlackSender {
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            test_redirect: None,
        }
    }

    pub fn with_test_redirect(mut self, handle: Option<String>) -> Self {
        if let Some(h) = &handle {
            tracing::warn!(redirect = %h, "Slack test mode active — all recipients redirected");
        }
        self.test_redirect = handle;
        self
    }

    /// Target a user by handle, tolerating a stored leading `@`.
    fn channel_target(handle: &str) -> String {
        format!("@{}", handle.trim_start_matches('@'))
    }

    /// Build the provider request body.
    pub fn payload(&self, message: &OutboundMessage) -> serde_json::Value {
        let handle = self
            .test_redirect
            .as_deref()
            .unwrap_or(&message.recipient);
        json!({
            "channel": Self::channel_target(handle),
            "text": message.body,
        })
    }
}

#[async_trait]
impl ChannelSender for SlackSender {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, AppError> {
        let response = self
            .http
            .post(SLACK_ENDPOINT)
            .bearer_auth(&self.bot_token)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| AppError::SendFailed(format!("slack request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::SendFailed(format!(
                "slack returned {status}: {body}"
            )));
        }

        // Slack reports application errors in-band
        let ok = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("ok").and_then(|ok| ok.as_bool()))
            .unwrap_or(false);
        if !ok {
            return Err(AppError::SendFailed(format!("slack rejected message: {body}")));
        }

        tracing::info!(recipient = %message.recipient, "Slack message delivered");
        Ok(ProviderResponse { status: body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> OutboundMessage {
        OutboundMessage {
            recipient: "jo.barnes".to_string(),
            subject: None,
            body: "Your membership expires soon".to_string(),
        }
    }

    #[test]
    fn test_payload_targets_handle() {
        let sender = SlackSender::new("xoxb-token".to_string());
        let payload = sender.payload(&make_message());
        assert_eq!(payload["channel"], "@jo.barnes");
        assert_eq!(payload["text"], "Your membership expires soon");
    }

    #[test]
    fn test_leading_at_not_doubled() {
        let sender = SlackSender::new("xoxb-token".to_string());
        let mut message = make_message();
        message.recipient = "@jo.barnes".to_string();
        let payload = sender.payload(&message);
        assert_eq!(payload["channel"], "@jo.barnes");
    }

    #[test]
    fn test_test_redirect_overrides_handle() {
        let sender = SlackSender::new("xoxb-token".to_string())
            .with_test_redirect(Some("dispatch-test".to_string()));
        let payload = sender.payload(&make_message());
        assert_eq!(payload["channel"], "@dispatch-test");
    }
}
