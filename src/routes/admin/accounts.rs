//! Admin account management.
//!
//! Operators set raw entitlement fields here; every response echoes the
//! recomputed preview (tier, add-ons, merged benefits, diagnostics) so the
//! effect of a change is visible before and after persisting. Raw inputs
//! are what gets stored, never derived results.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::info;
use ulid::Ulid;
use validator::Validate;

use crate::error::AppError;
use crate::queries::account::{self, AccountRow};
use crate::quotas;
use crate::routes::AppState;

/// Raw persisted fields, echoed back to the operator alongside the
/// derived preview.
#[derive(Debug, Serialize)]
pub struct AccountRawView {
    pub id: String,
    pub email: String,
    pub stored_value: Option<String>,
    pub vip: bool,
    pub expires_at: Option<i64>,
    pub addon_extraction: bool,
    pub addon_streaming: bool,
    pub addon_uploader: bool,
    pub benefit_overrides: Option<String>,
    pub is_admin: bool,
    pub created_at: i64,
}

impl From<&AccountRow> for AccountRawView {
    fn from(row: &AccountRow) -> Self {
        Self {
            id: row.id.clone(),
            email: row.email.clone(),
            stored_value: row.stored_value.clone(),
            vip: row.vip,
            expires_at: row.expires_at,
            addon_extraction: row.addon_extraction,
            addon_streaming: row.addon_streaming,
            addon_uploader: row.addon_uploader,
            benefit_overrides: row.benefit_overrides.clone(),
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

async fn account_with_preview(
    state: &AppState,
    row: AccountRow,
    now: OffsetDateTime,
) -> Result<Value, AppError> {
    let raw = AccountRawView::from(&row);
    let account = row.into_account();
    let counts = state.quota.usage(&account.id, now).await?;
    let usage = quotas::usage_from_counts(&counts);
    let (standing, diagnostics) = state.engine.standing(&account, &usage, now);

    Ok(json!({
        "account": raw,
        "standing": standing,
        "diagnostics": diagnostics,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /admin/accounts
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Value>, AppError> {
    let per_page = 20;
    let total = account::count_accounts(&state.pool).await?;
    let rows = account::list_accounts(&state.pool, query.page, per_page).await?;

    let accounts: Vec<AccountRawView> = rows.iter().map(AccountRawView::from).collect();

    Ok(Json(json!({
        "accounts": accounts,
        "total": total,
        "page": query.page.max(1),
        "per_page": per_page,
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountInput {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// POST /admin/accounts
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateAccountInput>,
) -> Result<Json<Value>, AppError> {
    input
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    if account::get_account_by_email(&state.pool, &input.email)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(format!(
            "account with email {} already exists",
            input.email
        )));
    }

    let id = format!("acc_{}", Ulid::new().to_string().to_lowercase());
    let now = OffsetDateTime::now_utc();
    account::insert_account(
        &state.pool,
        &id,
        &input.email,
        input.is_admin,
        now.unix_timestamp(),
    )
    .await?;

    info!(account_id = %id, email = %input.email, "account created");

    let row = account::get_account(&state.pool, &id)
        .await?
        .ok_or(AppError::AccountNotFound)?;
    Ok(Json(account_with_preview(&state, row, now).await?))
}

/// GET /admin/accounts/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let row = account::get_account(&state.pool, &id)
        .await?
        .ok_or(AppError::AccountNotFound)?;
    let now = OffsetDateTime::now_utc();
    Ok(Json(account_with_preview(&state, row, now).await?))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AddonFlagsInput {
    pub extraction: bool,
    pub streaming: bool,
    pub uploader: bool,
}

/// Full-document write of the tier-relevant fields. Absent optional fields
/// clear their column.
#[derive(Debug, Deserialize)]
pub struct UpdateAccountInput {
    pub stored_value: Option<String>,
    #[serde(default)]
    pub vip: bool,
    /// `YYYY-MM-DD`, interpreted as midday in the reference timezone.
    pub expires_at: Option<String>,
    #[serde(default)]
    pub addons: AddonFlagsInput,
    pub benefit_overrides: Option<Value>,
}

/// PUT /admin/accounts/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateAccountInput>,
) -> Result<Json<Value>, AppError> {
    if let Some(raw) = &input.stored_value {
        raw.parse::<Decimal>().map_err(|_| {
            AppError::Validation(format!("stored_value {raw:?} is not a decimal amount"))
        })?;
    }

    let expires_at = match &input.expires_at {
        Some(date) => Some(
            state
                .quota
                .windows()
                .parse_date_midday(date)
                .map_err(|err| AppError::Validation(err.to_string()))?
                .unix_timestamp(),
        ),
        None => None,
    };

    // The override document is persisted as submitted; validation happens
    // at merge time and surfaces as diagnostics in the preview below.
    let overrides = input
        .benefit_overrides
        .as_ref()
        .map(|value| value.to_string());

    let now = OffsetDateTime::now_utc();
    let updated = account::update_entitlement_fields(
        &state.pool,
        &id,
        input.stored_value.as_deref(),
        input.vip,
        expires_at,
        (
            input.addons.extraction,
            input.addons.streaming,
            input.addons.uploader,
        ),
        overrides.as_deref(),
        now.unix_timestamp(),
    )
    .await?;

    if !updated {
        return Err(AppError::AccountNotFound);
    }

    info!(account_id = %id, "entitlement fields updated");

    let row = account::get_account(&state.pool, &id)
        .await?
        .ok_or(AppError::AccountNotFound)?;
    Ok(Json(account_with_preview(&state, row, now).await?))
}

/// POST /admin/accounts/{id}/quota/{counter}/reset - the explicit
/// administrative reset, the one sanctioned way a counter goes down.
pub async fn reset_quota(
    State(state): State<AppState>,
    Path((id, counter)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    if state.quota.def(&counter).is_none() {
        return Err(AppError::Validation(format!(
            "unknown counter {counter:?}"
        )));
    }

    let row = account::get_account(&state.pool, &id)
        .await?
        .ok_or(AppError::AccountNotFound)?;

    let now = OffsetDateTime::now_utc();
    state.quota.reset(&row.id, &counter, now).await?;

    info!(account_id = %row.id, counter = %counter, "quota counter reset by operator");

    Ok(Json(json!({
        "account_id": row.id,
        "counter": counter,
        "count": 0,
    })))
}
