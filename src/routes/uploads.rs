//! Upload tickets for label and artist accounts. Gated on the uploader
//! add-on by the access decision point; the actual file transfer goes
//! through the storage collaborator.

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use ulid::Ulid;

use crate::error::AppError;
use crate::middleware::CurrentAccount;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadInput {
    pub title: String,
    pub artist: String,
}

/// POST /api/uploads
pub async fn create(
    State(_state): State<AppState>,
    Extension(CurrentAccount(account)): Extension<CurrentAccount>,
    Json(input): Json<UploadInput>,
) -> Result<Json<Value>, AppError> {
    if input.title.trim().is_empty() || input.artist.trim().is_empty() {
        return Err(AppError::Validation(
            "title and artist must not be empty".to_string(),
        ));
    }

    let upload_id = Ulid::new().to_string();
    info!(
        account_id = %account.id,
        upload_id = %upload_id,
        title = %input.title,
        "upload ticket issued"
    );

    Ok(Json(json!({
        "upload_id": upload_id,
        "title": input.title,
        "artist": input.artist,
    })))
}
