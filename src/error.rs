use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use trackpool_entitlement::DenyReason;
use trackpool_quota::Denial;

/// Application-level error. Denials always carry a machine-readable reason
/// so the presentation layer can pick the right message without this crate
/// knowing anything about rendering.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("admin privileges required")]
    AdminRequired,

    #[error("access denied: {0}")]
    AccessDenied(DenyReason),

    #[error("quota denied")]
    Quota(Denial),

    #[error("account not found")]
    AccountNotFound,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<trackpool_quota::StoreError> for AppError {
    fn from(err: trackpool_quota::StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal server error"})),
                )
                    .into_response()
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "authentication required"})),
            )
                .into_response(),
            AppError::AdminRequired => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": "admin privileges required"})),
            )
                .into_response(),
            AppError::AccessDenied(reason) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "access denied",
                    "reason": reason.to_string(),
                })),
            )
                .into_response(),
            AppError::Quota(denial) => match denial {
                Denial::Quota { resets_at } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "quota exhausted",
                        "reason": denial.reason(),
                        "resets_at": resets_at.unix_timestamp(),
                    })),
                )
                    .into_response(),
                Denial::Unavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "error": "quota check unavailable",
                        "reason": denial.reason(),
                    })),
                )
                    .into_response(),
            },
            AppError::AccountNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "account not found"})),
            )
                .into_response(),
            AppError::Validation(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": message})),
            )
                .into_response(),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
