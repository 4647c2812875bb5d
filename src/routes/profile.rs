//! Current subscription standing for the authenticated account.

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::quotas;
use crate::routes::AppState;

/// GET /api/profile - tier, priced add-ons and effective benefits with
/// current usage. Recomputed on every request; operator changes are
/// visible immediately.
pub async fn standing(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
) -> Result<Json<Value>, AppError> {
    let now = OffsetDateTime::now_utc();

    let counts = state.quota.usage(&account.id, now).await?;
    let usage = quotas::usage_from_counts(&counts);
    let (standing, diagnostics) = state.engine.standing(&account, &usage, now);

    Ok(Json(json!({
        "standing": standing,
        "diagnostics": diagnostics,
    })))
}
