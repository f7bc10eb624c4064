//! Dispatch coordinator — the state machine behind every notification request.
//!
//! For a request to notify a member:
//! 1. Resolve the member (absent → `MemberNotFound`)
//! 2. Check channel eligibility (ineligible → logged no-op, not an error)
//! 3. Branch on the channel's delivery mode:
//!    - Slack sends immediately
//!    - Email queues with deferred template resolution
//!    - SMS renders the body now and queues with the raw phone number
//! 4. A drain pulls up to the remaining daily capacity, rewrites SMS
//!    recipients to carrier gateway addresses, sends, and removes each entry
//!    whether or not the send succeeded.
//!
//! Per-channel behavior lives in a strategy table rather than a type per
//! channel: each `ChannelKind` maps to a sender, a delivery mode, and an
//! addressing rule.

use std::collections::HashMap;
use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;
use uuid::Uuid;

use courier_channels::{ChannelSender, EmailSender, SlackSender, SmsSender, sms};
use courier_common::config::AppConfig;
use courier_common::error::AppError;
use courier_common::types::{
    ChannelKind, Disposition, Member, NoticeKind, OutboundMessage, QueuedMessage, non_empty,
};

use crate::eligibility::{self, FeatureFlags};
use crate::limiter::SendLimiter;
use crate::member::MemberService;
use crate::properties::{PropertyCache, PropertyService, keys};
use crate::queue::QueueService;
use crate::template::{TemplateResolver, subject_key, template_key};

/// How a channel's messages leave the building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryMode {
    /// Sent synchronously at request time (Slack).
    Immediate,
    /// Queued carrying template keys; rendered at drain time (Email).
    QueuedDeferred,
    /// Queued carrying a body rendered at enqueue time (SMS).
    QueuedRendered,
}

struct ChannelStrategy {
    sender: Arc<dyn ChannelSender>,
    mode: DeliveryMode,
}

pub struct DispatchCoordinator {
    channels: HashMap<ChannelKind, ChannelStrategy>,
}

impl DispatchCoordinator {
    pub fn new(
        email: Arc<dyn ChannelSender>,
        sms: Arc<dyn ChannelSender>,
        slack: Arc<dyn ChannelSender>,
    ) -> Self {
        let mut channels = HashMap::new();
        channels.insert(
            ChannelKind::Email,
            ChannelStrategy {
                sender: email,
                mode: DeliveryMode::QueuedDeferred,
            },
        );
        channels.insert(
            ChannelKind::Sms,
            ChannelStrategy {
                sender: sms,
                mode: DeliveryMode::QueuedRendered,
            },
        );
        channels.insert(
            ChannelKind::Slack,
            ChannelStrategy {
                sender: slack,
                mode: DeliveryMode::Immediate,
            },
        );
        Self { channels }
    }

    /// Build the production coordinator: Resend-backed email, carrier-gateway
    /// SMS on top of it, Slack Web API. Test-mode redirects and the BCC audit
    /// address come from properties, read once at startup.
    pub async fn from_config(
        pool: &PgPool,
        cache: &PropertyCache,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let test_mode = PropertyService::get_bool(pool, cache, keys::DELIVERY_TEST_MODE)
            .await
            .unwrap_or(false);
        let email_redirect = if test_mode {
            PropertyService::get_string(pool, cache, keys::DELIVERY_TEST_ADDRESS)
                .await
                .ok()
        } else {
            None
        };
        let slack_redirect = if test_mode {
            PropertyService::get_string(pool, cache, keys::DELIVERY_TEST_SLACK_HANDLE)
                .await
                .ok()
        } else {
            None
        };
        let bcc_audit = PropertyService::get_string(pool, cache, keys::DELIVERY_BCC_AUDIT)
            .await
            .ok();

        let email = Arc::new(
            EmailSender::new(
                config.resend_api_key.clone().unwrap_or_default(),
                config.email_from.clone().unwrap_or_default(),
            )
            .with_bcc_audit(bcc_audit)
            .with_test_redirect(email_redirect),
        );
        let sms = Arc::new(SmsSender::new(email.clone()));
        let slack = Arc::new(
            SlackSender::new(config.slack_bot_token.clone().unwrap_or_default())
                .with_test_redirect(slack_redirect),
        );

        Ok(Self::new(email, sms, slack))
    }

    fn strategy(&self, channel: ChannelKind) -> Result<&ChannelStrategy, AppError> {
        self.channels
            .get(&channel)
            .ok_or_else(|| AppError::Internal(format!("no sender registered for channel {channel}")))
    }

    /// Ask the engine to deliver a notice to one member over one channel.
    pub async fn notify(
        &self,
        pool: &PgPool,
        redis: &mut ConnectionManager,
        cache: &PropertyCache,
        member_id: Uuid,
        notice: NoticeKind,
        channel: ChannelKind,
    ) -> Result<Disposition, AppError> {
        let member = MemberService::find_by_id(pool, member_id).await?;
        let flags = FeatureFlags::load(pool, cache).await;

        if !eligibility::accepts(&member, channel, &flags) {
            tracing::info!(
                member_id = %member_id,
                channel = %channel,
                notice = %notice,
                "Member not eligible for channel, skipping"
            );
            return Ok(Disposition::Skipped);
        }

        let strategy = self.strategy(channel)?;
        match strategy.mode {
            DeliveryMode::Immediate => {
                let body =
                    TemplateResolver::resolve(pool, cache, &member, template_key(notice)).await?;
                let outbound = OutboundMessage {
                    recipient: Self::queue_recipient(&member, channel)?,
                    subject: None,
                    body,
                };
                let status = Self::deliver(redis, strategy.sender.as_ref(), &outbound).await;
                Ok(Disposition::Sent(status))
            }
            DeliveryMode::QueuedDeferred => {
                let message = QueuedMessage::templated(
                    channel,
                    member.id,
                    Self::queue_recipient(&member, channel)?,
                    template_key(notice).to_string(),
                    subject_key(notice).to_string(),
                );
                QueueService::enqueue(pool, &message).await?;
                Ok(Disposition::Queued)
            }
            DeliveryMode::QueuedRendered => {
                let body =
                    TemplateResolver::resolve(pool, cache, &member, template_key(notice)).await?;
                let message = QueuedMessage::rendered(
                    channel,
                    member.id,
                    Self::queue_recipient(&member, channel)?,
                    body,
                );
                QueueService::enqueue(pool, &message).await?;
                Ok(Disposition::Queued)
            }
        }
    }

    /// Manual admin send: bypasses the queue and the eligibility predicate,
    /// but still counts against the shared daily cap. Returns the provider's
    /// raw status string, or `None` when the provider rejected the send.
    pub async fn send_direct(
        &self,
        pool: &PgPool,
        redis: &mut ConnectionManager,
        cache: &PropertyCache,
        member_id: Uuid,
        notice: NoticeKind,
        channel: ChannelKind,
    ) -> Result<Option<String>, AppError> {
        let member = MemberService::find_by_id(pool, member_id).await?;
        let body = TemplateResolver::resolve(pool, cache, &member, template_key(notice)).await?;
        let subject = match channel {
            ChannelKind::Slack => None,
            _ => PropertyService::get_string(pool, cache, subject_key(notice))
                .await
                .ok(),
        };

        let raw = Self::queue_recipient(&member, channel)?;
        let recipient = match channel {
            ChannelKind::Sms => Self::gateway_recipient(&member, &raw)?,
            _ => raw,
        };

        let outbound = OutboundMessage {
            recipient,
            subject,
            body,
        };
        let strategy = self.strategy(channel)?;
        Ok(Self::deliver(redis, strategy.sender.as_ref(), &outbound).await)
    }

    /// Process queued messages up to the remaining daily capacity.
    ///
    /// Every pulled entry is removed whether its send succeeded or failed —
    /// there is no retry or dead-letter. Per-entry failures are logged and
    /// never abort the batch.
    pub async fn drain(
        &self,
        pool: &PgPool,
        redis: &mut ConnectionManager,
        cache: &PropertyCache,
    ) -> Result<u32, AppError> {
        let capacity = SendLimiter::remaining(redis, pool, cache).await?;
        if capacity == 0 {
            tracing::info!("No send capacity remaining today, skipping drain");
            return Ok(0);
        }

        let batch = QueueService::pending(pool, capacity as i64).await?;
        if batch.is_empty() {
            return Ok(0);
        }

        tracing::info!(capacity, batch = batch.len(), "Draining notification queue");

        let mut processed = 0u32;
        for entry in &batch {
            if let Err(e) = self.process_entry(pool, redis, cache, entry).await {
                tracing::error!(
                    message_id = %entry.id,
                    member_id = %entry.member_id,
                    channel = %entry.channel,
                    error = %e,
                    "Queued send failed; entry dropped without retry"
                );
            }
            QueueService::remove(pool, entry.id).await?;
            processed += 1;
        }

        tracing::info!(processed, "Queue drain complete");
        Ok(processed)
    }

    /// Current queue depth, for the admin surface.
    pub async fn queued_count(pool: &PgPool) -> Result<i64, AppError> {
        QueueService::count(pool).await
    }

    async fn process_entry(
        &self,
        pool: &PgPool,
        redis: &mut ConnectionManager,
        cache: &PropertyCache,
        entry: &QueuedMessage,
    ) -> Result<(), AppError> {
        let member = MemberService::find_by_id(pool, entry.member_id).await?;
        let strategy = self.strategy(entry.channel)?;

        let recipient = Self::send_recipient(&member, entry)?;
        let body = match &entry.body {
            Some(body) => body.clone(),
            None => {
                let key = entry.template_key.as_deref().ok_or_else(|| {
                    AppError::Internal("queued entry has neither body nor template key".to_string())
                })?;
                TemplateResolver::resolve(pool, cache, &member, key).await?
            }
        };
        let subject = match &entry.subject_key {
            Some(key) => match PropertyService::get_string(pool, cache, key).await {
                Ok(subject) => Some(subject),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Subject not configured, sending without one");
                    None
                }
            },
            None => None,
        };

        let outbound = OutboundMessage {
            recipient,
            subject,
            body,
        };

        if let Err(e) = SendLimiter::record(redis).await {
            tracing::error!(error = %e, "Failed to record send against daily cap");
        }
        strategy.sender.send(&outbound).await?;
        Ok(())
    }

    /// Count the attempt, send, and fold provider errors into `None` — the
    /// admin surface reports the raw status string or null, never an error
    /// for a rejected send.
    async fn deliver(
        redis: &mut ConnectionManager,
        sender: &dyn ChannelSender,
        outbound: &OutboundMessage,
    ) -> Option<String> {
        if let Err(e) = SendLimiter::record(redis).await {
            tracing::error!(error = %e, "Failed to record send against daily cap");
        }
        match sender.send(outbound).await {
            Ok(response) => Some(response.status),
            Err(e) => {
                tracing::error!(recipient = %outbound.recipient, error = %e, "Send failed");
                None
            }
        }
    }

    /// Address stored with a queued entry (or used for a direct send):
    /// the raw channel address from the member record.
    fn queue_recipient(member: &Member, channel: ChannelKind) -> Result<String, AppError> {
        let address = match channel {
            ChannelKind::Email => non_empty(member.email.as_deref()),
            ChannelKind::Sms => member.sms_destination(),
            ChannelKind::Slack => non_empty(member.slack_handle.as_deref()),
        };
        address.map(str::to_string).ok_or_else(|| {
            AppError::Validation(format!(
                "member {} has no {channel} address",
                member.id
            ))
        })
    }

    /// Send-time recipient rewrite. SMS entries store the raw phone number;
    /// here it becomes `<digits>@<carrier gateway>`. Other channels send to
    /// the stored recipient as-is.
    fn send_recipient(member: &Member, entry: &QueuedMessage) -> Result<String, AppError> {
        match entry.channel {
            ChannelKind::Sms => Self::gateway_recipient(member, &entry.recipient),
            _ => Ok(entry.recipient.clone()),
        }
    }

    fn gateway_recipient(member: &Member, phone: &str) -> Result<String, AppError> {
        let carrier = non_empty(member.carrier.as_deref()).ok_or_else(|| {
            AppError::SendFailed(format!("member {} has no carrier on file", member.id))
        })?;
        sms::gateway_address(phone, carrier).ok_or_else(|| {
            AppError::SendFailed(format!("no SMS gateway for carrier '{carrier}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    #[test]
    fn test_queue_recipient_per_channel() {
        let m = make_member();
        assert_eq!(
            DispatchCoordinator::queue_recipient(&m, ChannelKind::Email).unwrap(),
            "jo@example.com"
        );
        assert_eq!(
            DispatchCoordinator::queue_recipient(&m, ChannelKind::Sms).unwrap(),
            "5551234567"
        );
        assert_eq!(
            DispatchCoordinator::queue_recipient(&m, ChannelKind::Slack).unwrap(),
            "jo.barnes"
        );
    }

    #[test]
    fn test_queue_recipient_missing_address() {
        let mut m = make_member();
        m.email = None;
        assert!(DispatchCoordinator::queue_recipient(&m, ChannelKind::Email).is_err());
    }

    #[test]
    fn test_send_recipient_rewrites_sms_to_gateway() {
        let m = make_member();
        let entry = QueuedMessage::rendered(
            ChannelKind::Sms,
            m.id,
            "5551234567".to_string(),
            "body".to_string(),
        );
        assert_eq!(
            DispatchCoordinator::send_recipient(&m, &entry).unwrap(),
            "5551234567@vtext.com"
        );
    }

    #[test]
    fn test_send_recipient_leaves_email_untouched() {
        let m = make_member();
        let entry = QueuedMessage::templated(
            ChannelKind::Email,
            m.id,
            "jo@example.com".to_string(),
            "template.renewal_reminder".to_string(),
            "subject.renewal_reminder".to_string(),
        );
        assert_eq!(
            DispatchCoordinator::send_recipient(&m, &entry).unwrap(),
            "jo@example.com"
        );
    }

    #[test]
    fn test_send_recipient_unknown_carrier_fails() {
        let mut m = make_member();
        m.carrier = Some("Carrier Pigeon".to_string());
        let entry = QueuedMessage::rendered(
            ChannelKind::Sms,
            m.id,
            "5551234567".to_string(),
            "body".to_string(),
        );
        assert!(DispatchCoordinator::send_recipient(&m, &entry).is_err());
    }

    #[test]
    fn test_send_recipient_missing_carrier_fails() {
        let mut m = make_member();
        m.carrier = None;
        let entry = QueuedMessage::rendered(
            ChannelKind::Sms,
            m.id,
            "5551234567".to_string(),
            "body".to_string(),
        );
        assert!(DispatchCoordinator::send_recipient(&m, &entry).is_err());
    }
}
