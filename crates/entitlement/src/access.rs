//! Request-time access decision point.
//!
//! Evaluates a protected-path set against an account snapshot. Quota is a
//! separate concern: being allowed through here says nothing about having
//! slots left, so this module never touches the quota tracker.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use crate::account::Account;
use crate::addon::{self, Addon};
use crate::tier::TierTable;

/// A gating class a protected path can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Requires a paying tier.
    Tier,
    /// Requires a specific add-on to be active.
    Addon(Addon),
}

/// Compiled protected-path set. Paths match by prefix; a path may carry any
/// number of classes and all of them must pass.
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    pub(crate) entries: Vec<(String, Vec<PathClass>)>,
}

impl ProtectedPaths {
    fn classes_for<'a>(&'a self, path: &str) -> impl Iterator<Item = PathClass> + 'a {
        let path = path.to_string();
        self.entries
            .iter()
            .filter(move |(prefix, _)| path.starts_with(prefix.as_str()))
            .flat_map(|(_, classes)| classes.iter().copied())
    }
}

/// Machine-readable denial reason, rendered by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Tier,
    Addon(Addon),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Tier => write!(f, "tier"),
            DenyReason::Addon(addon) => write!(f, "addon:{addon}"),
        }
    }
}

impl Serialize for DenyReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `account` may access `path` at `now`.
///
/// Administrators and unlisted paths are always allowed. For listed paths
/// every class must pass; the first failing class determines the reason.
pub fn decide(
    account: &Account,
    path: &str,
    now: OffsetDateTime,
    tiers: &TierTable,
    paths: &ProtectedPaths,
) -> Decision {
    if account.is_admin {
        return Decision::Allow;
    }

    let active = addon::active_addons(account);

    for class in paths.classes_for(path) {
        match class {
            PathClass::Tier => {
                let tier = tiers.resolve(account.stored_value, account.vip, account.expires_at, now);
                if !tier.is_paying() {
                    tracing::debug!(account_id = %account.id, path, "tier gate denied");
                    return Decision::Deny(DenyReason::Tier);
                }
            }
            PathClass::Addon(required) => {
                if !active.contains(&required) {
                    tracing::debug!(account_id = %account.id, path, addon = %required, "addon gate denied");
                    return Decision::Deny(DenyReason::Addon(required));
                }
            }
        }
    }

    Decision::Allow
}
