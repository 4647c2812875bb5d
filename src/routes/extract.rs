//! Audio-extraction jobs (stems/acapellas). Gated on the extraction
//! add-on plus a paying tier.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::info;
use ulid::Ulid;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::routes::AppState;

/// POST /api/extract/{track_id}
pub async fn request(
    State(_state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Path(track_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let job_id = Ulid::new().to_string();
    info!(
        account_id = %account.id,
        track_id = %track_id,
        job_id = %job_id,
        "extraction job queued"
    );

    Ok(Json(json!({
        "job_id": job_id,
        "track_id": track_id,
        "status": "queued",
    })))
}
