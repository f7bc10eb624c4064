use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channels supported by the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Slack,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Email => write!(f, "email"),
            ChannelKind::Sms => write!(f, "sms"),
            ChannelKind::Slack => write!(f, "slack"),
        }
    }
}

/// The kinds of notices the coordinator can be asked to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    NewMembership,
    RenewalReminder,
    AdminTest,
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoticeKind::NewMembership => write!(f, "new_membership"),
            NoticeKind::RenewalReminder => write!(f, "renewal_reminder"),
            NoticeKind::AdminTest => write!(f, "admin_test"),
        }
    }
}

/// A club member. Owned by the roster subsystem; the dispatch engine only
/// reads members, it never persists changes to them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: Uuid,
    /// Identifier on the external roster this record was imported from.
    pub roster_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub cell_phone: Option<String>,
    pub home_phone: Option<String>,
    pub carrier: Option<String>,
    pub slack_handle: Option<String>,
    pub email_enabled: bool,
    pub sms_enabled: bool,
    pub slack_enabled: bool,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Set the email address. A non-empty address implicitly opts the member
    /// into email notices; clearing the address leaves the flag untouched.
    pub fn set_email(&mut self, email: Option<String>) {
        if email.as_deref().is_some_and(|v| !v.is_empty()) {
            self.email_enabled = true;
        }
        self.email = email;
    }

    /// Set the cell phone. A non-empty number implicitly opts the member into
    /// SMS notices; clearing the number leaves the flag untouched.
    pub fn set_cell_phone(&mut self, cell_phone: Option<String>) {
        if cell_phone.as_deref().is_some_and(|v| !v.is_empty()) {
            self.sms_enabled = true;
        }
        self.cell_phone = cell_phone;
    }

    /// Set the Slack handle. A non-empty handle implicitly opts the member
    /// into Slack notices; clearing the handle leaves the flag untouched.
    pub fn set_slack_handle(&mut self, slack_handle: Option<String>) {
        if slack_handle.as_deref().is_some_and(|v| !v.is_empty()) {
            self.slack_enabled = true;
        }
        self.slack_handle = slack_handle;
    }

    /// SMS destination: cell phone, falling back to home phone.
    pub fn sms_destination(&self) -> Option<&str> {
        non_empty(self.cell_phone.as_deref()).or_else(|| non_empty(self.home_phone.as_deref()))
    }
}

/// Treat empty strings the same as absent fields.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// An outbound message persisted in the notification queue.
///
/// Email entries carry `template_key` + `subject_key` and are rendered at
/// drain time; SMS entries carry a pre-rendered `body`. The recipient is
/// rewritten at send time for SMS (carrier gateway address).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub channel: ChannelKind,
    pub member_id: Uuid,
    pub recipient: String,
    pub template_key: Option<String>,
    pub subject_key: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueuedMessage {
    /// Entry whose template resolution is deferred to drain time.
    pub fn templated(
        channel: ChannelKind,
        member_id: Uuid,
        recipient: String,
        template_key: String,
        subject_key: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            member_id,
            recipient,
            template_key: Some(template_key),
            subject_key: Some(subject_key),
            body: None,
            created_at: Utc::now(),
        }
    }

    /// Entry with an already-rendered body.
    pub fn rendered(
        channel: ChannelKind,
        member_id: Uuid,
        recipient: String,
        body: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            member_id,
            recipient,
            template_key: None,
            subject_key: None,
            body: Some(body),
            created_at: Utc::now(),
        }
    }
}

/// A fully-addressed message ready to hand to a channel sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Raw provider status/body, kept as a string for logging and for the
/// admin surface, which returns it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub status: String,
}

/// What the coordinator did with a notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "disposition", content = "status")]
pub enum Disposition {
    /// Sent immediately (Slack); carries the provider status when available.
    Sent(Option<String>),
    /// Persisted to the queue for a later drain.
    Queued,
    /// Member ineligible for the channel; nothing was persisted or sent.
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_member() -> Member {
        Member {
            id: Uuid::new_v4(),
            roster_id: 1042,
            first_name: "Jo".to_string(),
            last_name: "Barnes".to_string(),
            email: None,
            cell_phone: None,
            home_phone: None,
            carrier: None,
            slack_handle: None,
            email_enabled: false,
            sms_enabled: false,
            slack_enabled: false,
            expires_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_set_email_enables_flag() {
        let mut m = make_member();
        m.set_email(Some("jo@example.com".to_string()));
        assert!(m.email_enabled);
    }

    #[test]
    fn test_clear_email_keeps_flag() {
        let mut m = make_member();
        m.set_email(Some("jo@example.com".to_string()));
        m.set_email(None);
        assert!(m.email_enabled, "clearing the address must not flip the flag");
        assert!(m.email.is_none());
    }

    #[test]
    fn test_set_empty_email_does_not_enable() {
        let mut m = make_member();
        m.set_email(Some(String::new()));
        assert!(!m.email_enabled);
    }

    #[test]
    fn test_set_cell_phone_enables_sms() {
        let mut m = make_member();
        m.set_cell_phone(Some("5551234567".to_string()));
        assert!(m.sms_enabled);
    }

    #[test]
    fn test_set_slack_handle_enables_slack() {
        let mut m = make_member();
        m.set_slack_handle(Some("jo.barnes".to_string()));
        assert!(m.slack_enabled);
    }

    #[test]
    fn test_sms_destination_falls_back_to_home_phone() {
        let mut m = make_member();
        m.home_phone = Some("5559876543".to_string());
        assert_eq!(m.sms_destination(), Some("5559876543"));
        m.set_cell_phone(Some("5551234567".to_string()));
        assert_eq!(m.sms_destination(), Some("5551234567"));
    }

    #[test]
    fn test_sms_destination_ignores_empty_strings() {
        let mut m = make_member();
        m.cell_phone = Some(String::new());
        assert_eq!(m.sms_destination(), None);
    }
}
