//! Track download action. Access is decided by the gate middleware; this
//! handler only spends the daily download quota and hands the request on
//! to the storage proxy (out of scope here).

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::info;
use trackpool_entitlement::BenefitName;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::routes::{consume_benefit, AppState};

/// POST /api/downloads/{track_id}
pub async fn download(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(track_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let now = OffsetDateTime::now_utc();
    let grant = consume_benefit(&state, &account, BenefitName::DailyDownloads, now).await?;

    info!(
        account_id = %account.id,
        track_id = %track_id,
        used = grant.count,
        "download slot consumed"
    );

    Ok(Json(json!({
        "track_id": track_id,
        "used": grant.count,
        "remaining": grant.remaining,
    })))
}
