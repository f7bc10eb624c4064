//! Durable notification queue over the `queued_messages` table.
//!
//! Eligibility is enforced by the coordinator at enqueue time and is not
//! re-checked at drain time: a member who disables a channel after a message
//! is queued still receives that one message. Entries are removed after a
//! drain attempt regardless of the send outcome.

use sqlx::PgPool;
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::QueuedMessage;

pub struct QueueService;

impl QueueService {
    /// Persist an outbound message.
    pub async fn enqueue(pool: &PgPool, message: &QueuedMessage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO queued_messages
                (id, channel, member_id, recipient, template_key, subject_key, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id)
        .bind(message.channel)
        .bind(message.member_id)
        .bind(&message.recipient)
        .bind(&message.template_key)
        .bind(&message.subject_key)
        .bind(&message.body)
        .bind(message.created_at)
        .execute(pool)
        .await?;

        tracing::info!(
            message_id = %message.id,
            member_id = %message.member_id,
            channel = %message.channel,
            "Message queued"
        );

        Ok(())
    }

    /// Fetch up to `limit` pending entries, oldest first. The result is a
    /// one-shot snapshot; no other ordering is guaranteed.
    pub async fn pending(pool: &PgPool, limit: i64) -> Result<Vec<QueuedMessage>, AppError> {
        let messages: Vec<QueuedMessage> = sqlx::query_as(
            "SELECT * FROM queued_messages ORDER BY created_at ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }

    /// Delete an entry. Returns true if it existed.
    pub async fn remove(pool: &PgPool, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM queued_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of entries currently queued.
    pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM queued_messages")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
