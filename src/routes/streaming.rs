//! Premium-streaming partner handoff. Gated on the streaming add-on.

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use ulid::Ulid;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::routes::AppState;

/// GET /api/streaming/token - short-lived token for the partner player.
pub async fn token(
    State(_state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "account_id": account.id,
        "partner_token": Ulid::new().to_string(),
    })))
}
