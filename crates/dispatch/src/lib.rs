//! The notification dispatch engine.
//!
//! Decides whether, how, and when a message reaches a member:
//! 1. Per-channel eligibility from member preferences + global feature flags
//! 2. Durable queueing for Email/SMS, immediate delivery for Slack
//! 3. A shared daily send cap across manual and queued sends
//! 4. Channel-specific addressing (SMS via email-to-carrier gateway)
//! 5. Periodic drain/reset jobs driven by an explicit scheduler

pub mod coordinator;
pub mod eligibility;
pub mod limiter;
pub mod member;
pub mod properties;
pub mod queue;
pub mod scheduler;
pub mod template;
