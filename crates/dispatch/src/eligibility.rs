//! Per-channel eligibility predicates.
//!
//! A member may receive a message on a channel only when the channel's
//! address field is populated, the relevant opt-in flag is set, and the
//! global feature flag for the channel is on. The predicates are pure; the
//! global flags are loaded separately and fail closed when unconfigured.

use sqlx::PgPool;

use courier_common::types::{ChannelKind, Member, non_empty};

use crate::properties::{PropertyCache, PropertyService, keys};

/// Global per-channel feature flags, resolved from properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlags {
    pub email: bool,
    pub sms: bool,
    pub slack: bool,
}

impl FeatureFlags {
    /// Load all three flags. A missing or unreadable property disables the
    /// channel (fail-closed) and is logged, never propagated.
    pub async fn load(pool: &PgPool, cache: &PropertyCache) -> Self {
        Self {
            email: Self::flag(pool, cache, keys::FEATURE_EMAIL).await,
            sms: Self::flag(pool, cache, keys::FEATURE_SMS).await,
            slack: Self::flag(pool, cache, keys::FEATURE_SLACK).await,
        }
    }

    async fn flag(pool: &PgPool, cache: &PropertyCache, key: &str) -> bool {
        match PropertyService::get_bool(pool, cache, key).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::error!(key, error = %e, "Feature flag unavailable, failing closed");
                false
            }
        }
    }
}

/// Decide whether a member may receive a message on the given channel.
///
/// SMS does not consult the member-level opt-in flag: a reachable phone plus
/// the global flag is enough.
pub fn accepts(member: &Member, channel: ChannelKind, flags: &FeatureFlags) -> bool {
    match channel {
        ChannelKind::Email => {
            non_empty(member.email.as_deref()).is_some() && member.email_enabled && flags.email
        }
        ChannelKind::Sms => member.sms_destination().is_some() && flags.sms,
        ChannelKind::Slack => {
            non_empty(member.slack_handle.as_deref()).is_some()
                && member.slack_enabled
                && flags.slack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_member() -> Member {
        Member {
            id: Uuid::new_v4(),
            roster_id: 7,
            first_name: "Jo".to_string(),
            last_name: "Barnes".to_string(),
            email: Some("jo@example.com".to_string()),
            cell_phone: Some("5551234567".to_string()),
            home_phone: None,
            carrier: Some("Verizon".to_string()),
            slack_handle: Some("jo.barnes".to_string()),
            email_enabled: true,
            sms_enabled: true,
            slack_enabled: true,
            expires_on: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn all_on() -> FeatureFlags {
        FeatureFlags {
            email: true,
            sms: true,
            slack: true,
        }
    }

    #[test]
    fn test_fully_opted_in_member_accepted_everywhere() {
        let m = make_member();
        let flags = all_on();
        assert!(accepts(&m, ChannelKind::Email, &flags));
        assert!(accepts(&m, ChannelKind::Sms, &flags));
        assert!(accepts(&m, ChannelKind::Slack, &flags));
    }

    #[test]
    fn test_missing_address_rejects_regardless_of_flag() {
        let mut m = make_member();
        m.email = None;
        m.cell_phone = None;
        m.home_phone = None;
        m.slack_handle = None;
        let flags = all_on();
        assert!(!accepts(&m, ChannelKind::Email, &flags));
        assert!(!accepts(&m, ChannelKind::Sms, &flags));
        assert!(!accepts(&m, ChannelKind::Slack, &flags));
    }

    #[test]
    fn test_empty_address_treated_as_missing() {
        let mut m = make_member();
        m.email = Some(String::new());
        assert!(!accepts(&m, ChannelKind::Email, &all_on()));
    }

    #[test]
    fn test_member_opt_out_rejects_email_and_slack() {
        let mut m = make_member();
        m.email_enabled = false;
        m.slack_enabled = false;
        let flags = all_on();
        assert!(!accepts(&m, ChannelKind::Email, &flags));
        assert!(!accepts(&m, ChannelKind::Slack, &flags));
    }

    #[test]
    fn test_sms_ignores_member_opt_out() {
        let mut m = make_member();
        m.sms_enabled = false;
        assert!(accepts(&m, ChannelKind::Sms, &all_on()));
    }

    #[test]
    fn test_sms_falls_back_to_home_phone() {
        let mut m = make_member();
        m.cell_phone = None;
        m.home_phone = Some("5559876543".to_string());
        assert!(accepts(&m, ChannelKind::Sms, &all_on()));
    }

    #[test]
    fn test_global_flag_off_rejects() {
        let m = make_member();
        let flags = FeatureFlags::default();
        assert!(!accepts(&m, ChannelKind::Email, &flags));
        assert!(!accepts(&m, ChannelKind::Sms, &flags));
        assert!(!accepts(&m, ChannelKind::Slack, &flags));
    }
}
