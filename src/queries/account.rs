//! Account persistence: the `loadAccount` / `saveAccount` side of the
//! engine's persistence contract. Counter state lives in the quota store,
//! not here.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use trackpool_entitlement::{Account, AddonFlags};

/// Account row as persisted. Raw operator inputs only; derived values
/// (tier, merged benefits) are never written back.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
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
    pub updated_at: Option<i64>,
}

impl AccountRow {
    /// Snapshot for the engine. A stored value that no longer parses is
    /// treated as absent; it can only appear through manual database edits
    /// and must not take the whole account down.
    pub fn into_account(self) -> Account {
        let stored_value = self.stored_value.as_deref().and_then(|raw| {
            match raw.parse::<Decimal>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(account_id = %self.id, raw, "unparseable stored_value, ignoring");
                    None
                }
            }
        });

        let expires_at = self
            .expires_at
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok());

        Account {
            id: self.id,
            email: self.email,
            stored_value,
            vip: self.vip,
            expires_at,
            addons: AddonFlags {
                extraction: self.addon_extraction,
                streaming: self.addon_streaming,
                uploader: self.addon_uploader,
            },
            benefit_overrides: self.benefit_overrides,
            is_admin: self.is_admin,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, stored_value, vip, expires_at, \
     addon_extraction, addon_streaming, addon_uploader, \
     benefit_overrides, is_admin, created_at, updated_at";

pub async fn get_account(pool: &SqlitePool, id: &str) -> anyhow::Result<Option<AccountRow>> {
    let account = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn get_account_by_email(
    pool: &SqlitePool,
    email: &str,
) -> anyhow::Result<Option<AccountRow>> {
    let account = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn list_accounts(
    pool: &SqlitePool,
    page: i64,
    per_page: i64,
) -> anyhow::Result<Vec<AccountRow>> {
    let offset = (page.max(1) - 1) * per_page;
    let accounts = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

pub async fn count_accounts(pool: &SqlitePool) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn insert_account(
    pool: &SqlitePool,
    id: &str,
    email: &str,
    is_admin: bool,
    created_at: i64,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO accounts (id, email, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(id)
    .bind(email)
    .bind(is_admin)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Operator write: replaces every tier-relevant field with the submitted
/// raw inputs. Derived results are previewed, never persisted.
#[allow(clippy::too_many_arguments)]
pub async fn update_entitlement_fields(
    pool: &SqlitePool,
    id: &str,
    stored_value: Option<&str>,
    vip: bool,
    expires_at: Option<i64>,
    addons: (bool, bool, bool),
    benefit_overrides: Option<&str>,
    updated_at: i64,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE accounts
         SET stored_value = ?2, vip = ?3, expires_at = ?4,
             addon_extraction = ?5, addon_streaming = ?6, addon_uploader = ?7,
             benefit_overrides = ?8, updated_at = ?9
         WHERE id = ?1",
    )
    .bind(id)
    .bind(stored_value)
    .bind(vip)
    .bind(expires_at)
    .bind(addons.0)
    .bind(addons.1)
    .bind(addons.2)
    .bind(benefit_overrides)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Billing-status change delivered by the external payment collaborator.
/// Partial update: only the delivered fields move.
pub async fn apply_billing_event(
    pool: &SqlitePool,
    id: &str,
    stored_value: Option<&str>,
    expires_at: Option<i64>,
    updated_at: i64,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE accounts
         SET stored_value = COALESCE(?2, stored_value),
             expires_at = COALESCE(?3, expires_at),
             updated_at = ?4
         WHERE id = ?1",
    )
    .bind(id)
    .bind(stored_value)
    .bind(expires_at)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
