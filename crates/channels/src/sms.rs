//! SMS delivery via email-to-carrier SMTP gateways.
//!
//! There is no SMS provider account: the recipient's phone number is rewritten
//! to `<digits>@<carrier gateway domain>` and the message is handed to the
//! email sender. The gateway table is fixed; carriers outside it cannot be
//! reached.

use std::sync::Arc;

use async_trait::async_trait;

use courier_common::error::AppError;
use courier_common::types::{OutboundMessage, ProviderResponse};

use crate::ChannelSender;
use crate::email::EmailSender;

/// Carrier name (lowercased, alphanumeric only) → SMTP gateway domain.
const CARRIER_GATEWAYS: &[(&str, &str)] = &[
    ("verizon", "vtext.com"),
    ("att", "txt.att.net"),
    ("tmobile", "tmomail.net"),
    ("sprint", "messaging.sprintpcs.com"),
    ("uscellular", "email.uscc.net"),
    ("boostmobile", "sms.myboostmobile.com"),
    ("cricket", "sms.cricketwireless.net"),
    ("metropcs", "mymetropcs.com"),
    ("googlefi", "msg.fi.google.com"),
];

/// Look up the SMTP gateway domain for a carrier name.
///
/// Matching is forgiving about punctuation and case: "AT&T", "at&t" and
/// "ATT" all resolve to `txt.att.net`.
pub fn gateway_domain(carrier: &str) -> Option<&'static str> {
    let key: String = carrier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    CARRIER_GATEWAYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, domain)| *domain)
}

/// Rewrite a phone number + carrier into a gateway email address.
///
/// The phone number is normalized to bare digits; returns `None` when the
/// number has no digits or the carrier is unknown.
pub fn gateway_address(phone: &str, carrier: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    gateway_domain(carrier).map(|domain| format!("{digits}@{domain}"))
}

/// SMS "sender": transport is the email sender, addressing is the gateway
/// rewrite applied by the coordinator before the message reaches `send`.
pub struct SmsSender {
    email: Arc<EmailSender>,
}

impl SmsSender {
    pub fn new(email: Arc<EmailSender>) -> Self {
        Self { email }
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderResponse, AppError> {
        tracing::debug!(recipient = %message.recipient, "Delivering SMS through carrier gateway");
        self.email.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verizon_rewrite() {
        assert_eq!(
            gateway_address("5551234567", "Verizon"),
            Some("5551234567@vtext.com".to_string())
        );
    }

    #[test]
    fn test_formatted_number_is_normalized() {
        assert_eq!(
            gateway_address("(555) 123-4567", "Verizon"),
            Some("5551234567@vtext.com".to_string())
        );
    }

    #[test]
    fn test_carrier_punctuation_ignored() {
        assert_eq!(gateway_domain("AT&T"), Some("txt.att.net"));
        assert_eq!(gateway_domain("T-Mobile"), Some("tmomail.net"));
        assert_eq!(gateway_domain("US Cellular"), Some("email.uscc.net"));
    }

    #[test]
    fn test_unknown_carrier() {
        assert_eq!(gateway_domain("Carrier Pigeon"), None);
        assert_eq!(gateway_address("5551234567", "Carrier Pigeon"), None);
    }

    #[test]
    fn test_no_digits_rejected() {
        assert_eq!(gateway_address("not a number", "Verizon"), None);
    }
}
