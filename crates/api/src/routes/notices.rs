//! Admin notice routes — each maps 1:1 to a coordinator operation.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::types::{ChannelKind, NoticeKind};
use courier_dispatch::coordinator::DispatchCoordinator;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notices/new-membership", post(new_membership))
        .route("/api/notices/renewal", post(renewal))
        .route("/api/notices/test", post(test_notice))
        .route("/api/queue/count", get(queued_count))
}

#[derive(Debug, Deserialize)]
pub struct NoticeRequest {
    pub member_id: Uuid,
    /// Channels to dispatch on; defaults to all of them.
    #[serde(default = "all_channels")]
    pub channels: Vec<ChannelKind>,
}

fn all_channels() -> Vec<ChannelKind> {
    vec![ChannelKind::Email, ChannelKind::Sms, ChannelKind::Slack]
}

#[derive(Debug, Deserialize)]
pub struct TestNoticeRequest {
    pub member_id: Uuid,
    pub channel: ChannelKind,
}

/// POST /api/notices/new-membership — Welcome a new member.
async fn new_membership(
    State(state): State<AppState>,
    Json(request): Json<NoticeRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch_notice(state, request, NoticeKind::NewMembership).await
}

/// POST /api/notices/renewal — Remind a member to renew.
async fn renewal(
    State(state): State<AppState>,
    Json(request): Json<NoticeRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch_notice(state, request, NoticeKind::RenewalReminder).await
}

/// POST /api/notices/test — Manual test send, bypassing the queue.
/// Returns the provider's raw status string (null when the send failed).
async fn test_notice(
    State(state): State<AppState>,
    Json(request): Json<TestNoticeRequest>,
) -> Result<Json<Value>, AppError> {
    let mut redis = state.redis.clone();
    let status = state
        .coordinator
        .send_direct(
            &state.pool,
            &mut redis,
            &state.cache,
            request.member_id,
            NoticeKind::AdminTest,
            request.channel,
        )
        .await?;

    Ok(Json(json!({ "status": status })))
}

/// GET /api/queue/count — Current notification queue depth.
async fn queued_count(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let count = DispatchCoordinator::queued_count(&state.pool).await?;
    Ok(Json(json!({ "count": count })))
}

async fn dispatch_notice(
    state: AppState,
    request: NoticeRequest,
    notice: NoticeKind,
) -> Result<Json<Value>, AppError> {
    let mut redis = state.redis.clone();
    let mut results = serde_json::Map::new();

    for channel in request.channels {
        let disposition = state
            .coordinator
            .notify(
                &state.pool,
                &mut redis,
                &state.cache,
                request.member_id,
                notice,
                channel,
            )
            .await?;
        results.insert(
            channel.to_string(),
            serde_json::to_value(&disposition).unwrap_or(Value::Null),
        );
    }

    Ok(Json(Value::Object(results)))
}
