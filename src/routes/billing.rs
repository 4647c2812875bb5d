//! Billing-status change events from the external payment collaborator.
//!
//! The collaborator records amounts and expirations; tier is never stored,
//! it is re-derived on every request from these raw fields.

use axum::{extract::State, http::HeaderMap, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::info;

use crate::error::AppError;
use crate::queries::account;
use crate::routes::AppState;

const SECRET_HEADER: &str = "x-billing-secret";

#[derive(Debug, Deserialize)]
pub struct BillingEvent {
    pub account_id: String,
    /// New recorded amount, decimal string.
    #[serde(default)]
    pub stored_value: Option<String>,
    /// New expiration, unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// POST /api/billing/events
pub async fn event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<BillingEvent>,
) -> Result<Json<Value>, AppError> {
    let configured = &state.config.billing.webhook_secret;
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if configured.is_empty() || presented != configured {
        tracing::warn!("billing event with missing or wrong shared secret");
        return Err(AppError::Unauthorized);
    }

    if let Some(raw) = &event.stored_value {
        raw.parse::<Decimal>().map_err(|_| {
            AppError::Validation(format!("stored_value {raw:?} is not a decimal amount"))
        })?;
    }

    let updated = account::apply_billing_event(
        &state.pool,
        &event.account_id,
        event.stored_value.as_deref(),
        event.expires_at,
        OffsetDateTime::now_utc().unix_timestamp(),
    )
    .await?;

    if !updated {
        return Err(AppError::AccountNotFound);
    }

    info!(account_id = %event.account_id, "billing status applied");

    Ok(Json(json!({"applied": true})))
}
