//! Account snapshot consumed by the engine.

use rust_decimal::Decimal;
use time::OffsetDateTime;

/// One boolean per add-on, exactly as stored on the account row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddonFlags {
    pub extraction: bool,
    pub streaming: bool,
    pub uploader: bool,
}

/// Point-in-time snapshot of an account's entitlement-relevant state.
///
/// Loaded fresh from persistence for every request. Session claims are never
/// copied in here: stale claims must not influence tier resolution.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Operator-recorded paid amount. Drives tier resolution.
    pub stored_value: Option<Decimal>,
    /// Explicit operator grant; forces full access independent of tier math.
    pub vip: bool,
    /// If present and in the past, the account is expired.
    pub expires_at: Option<OffsetDateTime>,
    pub addons: AddonFlags,
    /// Raw benefit-override document as persisted. Untrusted; validated at
    /// merge time so a malformed document can never block a request.
    pub benefit_overrides: Option<String>,
    pub is_admin: bool,
}

impl Account {
    /// Minimal fixture used across the crate's tests.
    #[doc(hidden)]
    pub fn test_fixture(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{id}@trackpool.test"),
            stored_value: None,
            vip: false,
            expires_at: None,
            addons: AddonFlags::default(),
            benefit_overrides: None,
            is_admin: false,
        }
    }
}
