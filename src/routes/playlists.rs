//! Weekly playlist exports.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::info;
use trackpool_entitlement::BenefitName;
use ulid::Ulid;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::routes::{consume_benefit, AppState};

#[derive(Debug, Deserialize)]
pub struct ExportInput {
    pub playlist_id: String,
}

/// POST /api/playlists/export
pub async fn export(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(input): Json<ExportInput>,
) -> Result<Json<Value>, AppError> {
    let now = OffsetDateTime::now_utc();
    let grant = consume_benefit(&state, &account, BenefitName::PlaylistExports, now).await?;

    let export_id = Ulid::new().to_string();
    info!(
        account_id = %account.id,
        playlist_id = %input.playlist_id,
        export_id = %export_id,
        used = grant.count,
        "playlist export queued"
    );

    Ok(Json(json!({
        "export_id": export_id,
        "playlist_id": input.playlist_id,
        "used": grant.count,
        "remaining": grant.remaining,
    })))
}
