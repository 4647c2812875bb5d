//! Weekly pack requests: curated bundles assembled by the editorial team.

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
pub struct PackRequestInput {
    pub genre: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// POST /api/packs/request
pub async fn request(
    State(state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(input): Json<PackRequestInput>,
) -> Result<Json<Value>, AppError> {
    if input.genre.trim().is_empty() {
        return Err(AppError::Validation("genre must not be empty".to_string()));
    }

    let now = OffsetDateTime::now_utc();
    let grant = consume_benefit(&state, &account, BenefitName::PackRequests, now).await?;

    let request_id = Ulid::new().to_string();
    info!(
        account_id = %account.id,
        request_id = %request_id,
        genre = %input.genre,
        used = grant.count,
        "pack request accepted"
    );

    Ok(Json(json!({
        "request_id": request_id,
        "used": grant.count,
        "remaining": grant.remaining,
    })))
}
