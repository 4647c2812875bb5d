//! Engine configuration as deserialized from the application config.
//!
//! Everything here is raw input. [`crate::Engine::from_config`] is the only
//! way to turn it into something the engine will use, and it refuses to
//! build on any misconfiguration: wrong tier decisions are worse than a
//! failed startup.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::benefit::BenefitDefaults;
use crate::tier::Tier;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "tier thresholds must be strictly increasing, got basic {basic}, standard {standard}, full {full}"
    )]
    NonIncreasingThresholds {
        basic: Decimal,
        standard: Decimal,
        full: Decimal,
    },
    #[error("tier pin key {value:?} is not a valid monetary amount")]
    InvalidPin { value: String },
    #[error("addon {addon} has a negative base price")]
    NegativePrice { addon: String },
    #[error("addon {addon} discount for tier {tier} must be within [0, 1]")]
    DiscountOutOfRange { addon: String, tier: String },
    #[error("protected path {path:?} has unknown class {class:?}")]
    UnknownPathClass { path: String, class: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntitlementConfig {
    pub tiers: TierConfig,
    pub addons: AddonsConfig,
    pub benefits: BenefitDefaults,
    pub protected_paths: Vec<ProtectedPathConfig>,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            tiers: TierConfig::default(),
            addons: AddonsConfig::default(),
            benefits: BenefitDefaults::default(),
            protected_paths: default_protected_paths(),
        }
    }
}

/// Monetary thresholds, inclusive lower bounds. Amounts deserialize from
/// strings (`basic = "20.00"`) so no float rounding sneaks in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub basic: Decimal,
    pub standard: Decimal,
    pub full: Decimal,
    /// Exact-value pins applied before the threshold ladder, keyed by the
    /// exact stored amount. Deliberate configuration only; ships empty.
    pub pins: BTreeMap<String, Tier>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            basic: Decimal::new(2000, 2),
            standard: Decimal::new(3500, 2),
            full: Decimal::new(6000, 2),
            pins: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AddonsConfig {
    pub extraction: AddonPriceConfig,
    pub streaming: AddonPriceConfig,
    pub uploader: AddonPriceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AddonPriceConfig {
    pub base_price: Decimal,
    pub discounts: DiscountsConfig,
}

impl Default for AddonPriceConfig {
    fn default() -> Self {
        Self {
            base_price: Decimal::new(1000, 2),
            discounts: DiscountsConfig::default(),
        }
    }
}

/// Per-tier discount fractions in `[0, 1]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscountsConfig {
    pub none: Decimal,
    pub basic: Decimal,
    pub standard: Decimal,
    pub full: Decimal,
}

impl Default for DiscountsConfig {
    fn default() -> Self {
        Self {
            none: Decimal::ZERO,
            basic: Decimal::new(10, 2),
            standard: Decimal::new(25, 2),
            full: Decimal::new(50, 2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedPathConfig {
    pub path: String,
    pub classes: Vec<String>,
}

fn default_protected_paths() -> Vec<ProtectedPathConfig> {
    let entry = |path: &str, classes: &[&str]| ProtectedPathConfig {
        path: path.to_string(),
        classes: classes.iter().map(|class| class.to_string()).collect(),
    };

    vec![
        entry("/api/downloads", &["tier"]),
        entry("/api/packs", &["tier"]),
        entry("/api/playlists", &["tier"]),
        entry("/api/extract", &["tier", "addon:extraction"]),
        entry("/api/streaming", &["addon:streaming"]),
        entry("/api/uploads", &["addon:uploader"]),
    ]
}
