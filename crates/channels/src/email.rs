//! Email delivery via the Resend HTTP API.
//!
//! Every outbound email carries a configurable BCC audit address. In test
//! mode the real recipient is replaced with one configured test address so a
//! staging deployment can never mail actual members.

use async_trait::async_trait;
use serde_json::json;

use courier_common::error::AppError;
use courier_common::types::{OutboundMessage, ProviderResponse};

use crate::ChannelSender;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

pub struct EmailSender {
    http: reqwest::Client,
    api_key: String,
    from: String,
    /// Audit address copied on every outbound email.
    bcc_audit: Option<String>,
    /// When set, replaces the real recipient (test mode).
    test_redirect: Option<String>,
}

impl EmailSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
            bcc_audit: None,
            test_redirect: None,
        }
    }

    pub fn with_bcc_audit(mut self, address: Option<String>) -> Self {
        self.bcc_audit = address;
        self
    }

    pub fn with_test_redirect(mut self, address: Option<String>) -> Self {
        if let Some(addr) = &address {
            tracing::warn!(redirect = %addr, "Email test mode active — all recipients redirected");
        }
        self.test_redirect = address;
        self
    }

    fn effective_recipient<'a>(&'a self, recipient: &'a str) -> &'a str {
        self.test_redirect.as_deref().unwrap_or(recipient)
    }

    /// Build the provider request body.
    pub fn payload(&self, message: &OutboundMessage) -> serde_json::Value {
        let mut payload = json!({
            "from": self.from,
            "to": [self.effective_recipient(&message.recipient)],
            "subject": message.subject.clone().unwrap_or_default(),
            "text": message.body,
        });
        if let Some(bcc) = &self.bcc_audit {
            payload["bcc"] = json!([bcc]);
        }
        payload
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, AppError> {
        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| AppError::SendFailed(format!("email provider request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(AppError::SendFailed(format!(
                "email provider returned {status}: {body}"
            )));
        }

        tracing::info!(recipient = %message.recipient, "Email accepted by provider");
        Ok(ProviderResponse { status: body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> OutboundMessage {
        OutboundMessage {
            recipient: "jo@example.com".to_string(),
            subject: Some("Welcome to the club".to_string()),
            body: "Hi Jo".to_string(),
        }
    }

    #[test]
    fn test_payload_includes_subject_and_recipient() {
        let sender = EmailSender::new("key".to_string(), "club@example.com".to_string());
        let payload = sender.payload(&make_message());
        assert_eq!(payload["from"], "club@example.com");
        assert_eq!(payload["to"][0], "jo@example.com");
        assert_eq!(payload["subject"], "Welcome to the club");
        assert_eq!(payload["text"], "Hi Jo");
        assert!(payload.get("bcc").is_none());
    }

    #[test]
    fn test_payload_carries_bcc_audit() {
        let sender = EmailSender::new("key".to_string(), "club@example.com".to_string())
            .with_bcc_audit(Some("audit@example.com".to_string()));
        let payload = sender.payload(&make_message());
        assert_eq!(payload["bcc"][0], "audit@example.com");
    }

    #[test]
    fn test_test_redirect_overrides_recipient() {
        let sender = EmailSender::new("key".to_string(), "club@example.com".to_string())
            .with_test_redirect(Some("test@example.com".to_string()));
        let payload = sender.payload(&make_message());
        assert_eq!(payload["to"][0], "test@example.com");
    }

    #[test]
    fn test_missing_subject_defaults_to_empty() {
        let sender = EmailSender::new("key".to_string(), "club@example.com".to_string());
        let mut message = make_message();
        message.subject = None;
        let payload = sender.payload(&message);
        assert_eq!(payload["subject"], "");
    }
}
