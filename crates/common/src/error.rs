use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Common error types used across the application.
///
/// `ConfigMissing` and `TemplateMissing` are expected, frequent conditions:
/// predicates, the limiter, and the resolver catch them locally and fall back
/// to a fail-closed default instead of propagating them out of a drain.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Member {0} not found")]
    MemberNotFound(Uuid),

    #[error("Property not configured: {0}")]
    ConfigMissing(String),

    #[error("Template not configured: {0}")]
    TemplateMissing(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Redis(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::MemberNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ConfigMissing(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::TemplateMissing(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::SendFailed(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
