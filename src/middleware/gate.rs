//! Access decision point, applied to every API route.
//!
//! Asks the entitlement engine whether the authenticated account may touch
//! the requested path. Quota consumption is not evaluated here; the action
//! handlers enforce it after access is granted.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use trackpool_entitlement::Decision;

use crate::error::AppError;
use crate::middleware::auth::CurrentAccount;
use crate::routes::AppState;

pub async fn gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(account) = request.extensions().get::<CurrentAccount>() else {
        tracing::warn!("gate middleware reached without an authenticated account");
        return AppError::Unauthorized.into_response();
    };

    let path = request.uri().path();
    let now = OffsetDateTime::now_utc();

    match state.engine.decide(&account.0, path, now) {
        Decision::Allow => next.run(request).await,
        Decision::Deny(reason) => {
            tracing::info!(account_id = %account.0.id, path, reason = %reason, "access denied");
            AppError::AccessDenied(reason).into_response()
        }
    }
}
