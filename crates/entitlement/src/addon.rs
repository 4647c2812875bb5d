//! Add-on activation and pricing.
//!
//! Add-ons are independently-toggled paid features. The tier never gates
//! whether an add-on is active, only what it costs per month.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::tier::Tier;

/// The three optional paid add-ons.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Addon {
    /// Audio-extraction service (stems/acapellas).
    Extraction,
    /// Premium-streaming partner integration.
    Streaming,
    /// Uploader privilege for label and artist accounts.
    Uploader,
}

/// The set of add-ons active on an account, purely from its flags.
pub fn active_addons(account: &Account) -> BTreeSet<Addon> {
    let mut addons = BTreeSet::new();
    if account.addons.extraction {
        addons.insert(Addon::Extraction);
    }
    if account.addons.streaming {
        addons.insert(Addon::Streaming);
    }
    if account.addons.uploader {
        addons.insert(Addon::Uploader);
    }
    addons
}

/// Per-tier discount percentages for one add-on, each in `[0, 1]`.
#[derive(Debug, Clone)]
pub(crate) struct TierDiscounts {
    pub none: Decimal,
    pub basic: Decimal,
    pub standard: Decimal,
    pub full: Decimal,
}

impl TierDiscounts {
    fn for_tier(&self, tier: Tier) -> Decimal {
        match tier {
            Tier::None => self.none,
            Tier::Basic => self.basic,
            Tier::Standard => self.standard,
            Tier::Full => self.full,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AddonPrice {
    pub base_price: Decimal,
    pub discounts: TierDiscounts,
}

/// Validated pricing table, built by [`crate::Engine::from_config`].
#[derive(Debug, Clone)]
pub struct AddonPricing {
    pub(crate) prices: BTreeMap<Addon, AddonPrice>,
}

impl AddonPricing {
    /// Monthly cost of an add-on at the given tier:
    /// `base_price * (1 - discount)`, floored at zero.
    pub fn monthly_cost(&self, addon: Addon, tier: Tier) -> Decimal {
        let Some(price) = self.prices.get(&addon) else {
            return Decimal::ZERO;
        };
        let discount = price.discounts.for_tier(tier);
        (price.base_price * (Decimal::ONE - discount)).max(Decimal::ZERO)
    }
}
