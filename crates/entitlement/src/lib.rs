//! Entitlement engine for trackpool.
//!
//! Pure decision logic for the subscription side of the platform: which tier
//! an account effectively holds, which add-ons are active and what they cost,
//! the merged benefit set (tier defaults overlaid with per-account operator
//! overrides), and the request-time access decision for protected paths.
//!
//! Nothing in this crate performs I/O. Callers load an [`Account`] snapshot,
//! thread `now` in explicitly, and feed current quota usage from the quota
//! tracker. The same inputs always produce the same outputs.

pub mod access;
pub mod account;
pub mod addon;
pub mod benefit;
pub mod config;
pub mod tier;

mod engine;

pub use access::{Decision, DenyReason};
pub use account::{Account, AddonFlags};
pub use addon::Addon;
pub use benefit::{Benefit, BenefitName, BenefitSet, Diagnostic, QuotaUsage};
pub use config::{ConfigError, EntitlementConfig};
pub use engine::{AddonCost, Engine, Standing};
pub use tier::Tier;
