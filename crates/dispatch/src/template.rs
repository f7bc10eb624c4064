//! Message template resolution.
//!
//! Templates live in the property store, one per notice kind, and support
//! four placeholders: `{{firstName}}`, `{{lastName}}`, `{{expirationDate}}`
//! (formatted `MMM d, yyyy`; today's date when the member has none) and
//! `{{url}}` (the member's renewal link). The substitution itself is pure;
//! only the property lookups touch the database.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use courier_common::error::AppError;
use courier_common::types::{Member, NoticeKind};

use crate::properties::{PropertyCache, PropertyService, keys};

/// Property key holding the template for a notice kind.
pub fn template_key(notice: NoticeKind) -> &'static str {
    match notice {
        NoticeKind::NewMembership => "template.new_membership",
        NoticeKind::RenewalReminder => "template.renewal_reminder",
        NoticeKind::AdminTest => "template.admin_test",
    }
}

/// Property key holding the email subject for a notice kind.
pub fn subject_key(notice: NoticeKind) -> &'static str {
    match notice {
        NoticeKind::NewMembership => "subject.new_membership",
        NoticeKind::RenewalReminder => "subject.renewal_reminder",
        NoticeKind::AdminTest => "subject.admin_test",
    }
}

pub struct TemplateResolver;

impl TemplateResolver {
    /// Look up a template by key and substitute the member's fields.
    ///
    /// A missing template key is a `TemplateMissing` error; callers treat it
    /// the same as any other unconfigured property. The renewal-URL base is
    /// only looked up when the template actually uses `{{url}}`.
    pub async fn resolve(
        pool: &PgPool,
        cache: &PropertyCache,
        member: &Member,
        key: &str,
    ) -> Result<String, AppError> {
        let template = PropertyService::get_string(pool, cache, key)
            .await
            .map_err(|_| AppError::TemplateMissing(key.to_string()))?;

        let url = if template.contains("{{url}}") {
            let base = PropertyService::get_string(pool, cache, keys::RENEWAL_URL_BASE).await?;
            Self::renewal_url(&base, member)
        } else {
            String::new()
        };

        Ok(Self::render(
            &template,
            member,
            Utc::now().date_naive(),
            &url,
        ))
    }

    /// Substitute placeholders. Pure.
    pub fn render(template: &str, member: &Member, today: NaiveDate, url: &str) -> String {
        let expiration = member
            .expires_on
            .unwrap_or(today)
            .format("%b %-d, %Y")
            .to_string();

        template
            .replace("{{firstName}}", &member.first_name)
            .replace("{{lastName}}", &member.last_name)
            .replace("{{expirationDate}}", &expiration)
            .replace("{{url}}", url)
    }

    /// Renewal link for a member, built from their roster identity.
    pub fn renewal_url(base: &str, member: &Member) -> String {
        format!("{base}?member={}", member.roster_id)
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
            expires_on: NaiveDate::from_ymd_opt(2026, 10, 5),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_substitutes_names_and_expiration() {
        let m = make_member();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let out = TemplateResolver::render(
            "Hi {{firstName}} {{lastName}}, renew by {{expirationDate}}",
            &m,
            today,
            "",
        );
        assert_eq!(out, "Hi Jo Barnes, renew by Oct 5, 2026");
    }

    #[test]
    fn test_render_uses_today_when_no_expiration() {
        let mut m = make_member();
        m.expires_on = None;
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let out = TemplateResolver::render("renew by {{expirationDate}}", &m, today, "");
        assert_eq!(out, "renew by Aug 30, 2026");
    }

    #[test]
    fn test_render_substitutes_url() {
        let m = make_member();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let url = TemplateResolver::renewal_url("https://club.example.com/renew", &m);
        let out = TemplateResolver::render("Renew here: {{url}}", &m, today, &url);
        assert_eq!(out, "Renew here: https://club.example.com/renew?member=1042");
    }

    #[test]
    fn test_render_leaves_plain_text_untouched() {
        let m = make_member();
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let out = TemplateResolver::render("No placeholders here.", &m, today, "");
        assert_eq!(out, "No placeholders here.");
    }

    #[test]
    fn test_template_keys_per_notice() {
        assert_eq!(
            template_key(NoticeKind::NewMembership),
            "template.new_membership"
        );
        assert_eq!(
            template_key(NoticeKind::RenewalReminder),
            "template.renewal_reminder"
        );
        assert_eq!(
            subject_key(NoticeKind::AdminTest),
            "subject.admin_test"
        );
    }
}
