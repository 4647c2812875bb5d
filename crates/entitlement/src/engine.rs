//! Compiled engine: validated configuration plus the component entry points.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::access::{self, Decision, PathClass, ProtectedPaths};
use crate::account::Account;
use crate::addon::{self, Addon, AddonPrice, AddonPricing, TierDiscounts};
use crate::benefit::{self, BenefitDefaults, BenefitSet, Diagnostic, QuotaUsage};
use crate::config::{AddonPriceConfig, ConfigError, EntitlementConfig};
use crate::tier::{Tier, TierTable};

/// The entitlement engine. Construction validates the whole configuration;
/// a misconfigured engine never comes into existence.
#[derive(Debug, Clone)]
pub struct Engine {
    tiers: TierTable,
    pricing: AddonPricing,
    benefits: BenefitDefaults,
    paths: ProtectedPaths,
}

impl Engine {
    pub fn from_config(config: &EntitlementConfig) -> Result<Self, ConfigError> {
        let tiers = &config.tiers;
        if !(tiers.basic < tiers.standard && tiers.standard < tiers.full) {
            return Err(ConfigError::NonIncreasingThresholds {
                basic: tiers.basic,
                standard: tiers.standard,
                full: tiers.full,
            });
        }

        let mut pins = BTreeMap::new();
        for (value, tier) in &tiers.pins {
            let amount: Decimal = value
                .parse()
                .map_err(|_| ConfigError::InvalidPin {
                    value: value.clone(),
                })?;
            pins.insert(amount, *tier);
        }

        let mut prices = BTreeMap::new();
        for (addon, price) in [
            (Addon::Extraction, &config.addons.extraction),
            (Addon::Streaming, &config.addons.streaming),
            (Addon::Uploader, &config.addons.uploader),
        ] {
            prices.insert(addon, compile_price(addon, price)?);
        }

        let mut entries = Vec::new();
        for protected in &config.protected_paths {
            let mut classes = Vec::new();
            for class in &protected.classes {
                classes.push(parse_class(&protected.path, class)?);
            }
            entries.push((protected.path.clone(), classes));
        }

        Ok(Self {
            tiers: TierTable::new(tiers.basic, tiers.standard, tiers.full, pins),
            pricing: AddonPricing { prices },
            benefits: config.benefits.clone(),
            paths: ProtectedPaths { entries },
        })
    }

    /// Plan resolver entry point.
    pub fn resolve_tier(&self, account: &Account, now: OffsetDateTime) -> Tier {
        self.tiers
            .resolve(account.stored_value, account.vip, account.expires_at, now)
    }

    pub fn active_addons(&self, account: &Account) -> BTreeSet<Addon> {
        addon::active_addons(account)
    }

    pub fn monthly_cost(&self, addon: Addon, tier: Tier) -> Decimal {
        self.pricing.monthly_cost(addon, tier)
    }

    /// Benefit merger entry point. `usage` comes from the quota tracker.
    pub fn merge_benefits(
        &self,
        account: &Account,
        usage: &QuotaUsage,
        now: OffsetDateTime,
    ) -> (BenefitSet, Vec<Diagnostic>) {
        let tier = self.resolve_tier(account, now);
        let addons = self.active_addons(account);
        benefit::merge_benefits(
            tier,
            &addons,
            account.benefit_overrides.as_deref(),
            usage,
            &self.benefits,
        )
    }

    /// Access decision point entry point.
    pub fn decide(&self, account: &Account, path: &str, now: OffsetDateTime) -> Decision {
        access::decide(account, path, now, &self.tiers, &self.paths)
    }

    /// Full standing for the profile API and the admin preview: tier,
    /// priced add-ons and the merged benefit set, with any diagnostics the
    /// override validation produced.
    pub fn standing(
        &self,
        account: &Account,
        usage: &QuotaUsage,
        now: OffsetDateTime,
    ) -> (Standing, Vec<Diagnostic>) {
        let tier = self.resolve_tier(account, now);
        let addons = self
            .active_addons(account)
            .into_iter()
            .map(|addon| AddonCost {
                addon,
                monthly_cost: self.monthly_cost(addon, tier),
            })
            .collect();
        let (benefits, diagnostics) = self.merge_benefits(account, usage, now);

        (
            Standing {
                account_id: account.id.clone(),
                tier,
                vip: account.vip,
                expires_at: account.expires_at.map(OffsetDateTime::unix_timestamp),
                addons,
                benefits,
            },
            diagnostics,
        )
    }
}

fn compile_price(addon: Addon, config: &AddonPriceConfig) -> Result<AddonPrice, ConfigError> {
    if config.base_price < Decimal::ZERO {
        return Err(ConfigError::NegativePrice {
            addon: addon.to_string(),
        });
    }

    let discounts = [
        (Tier::None, config.discounts.none),
        (Tier::Basic, config.discounts.basic),
        (Tier::Standard, config.discounts.standard),
        (Tier::Full, config.discounts.full),
    ];
    for (tier, discount) in discounts {
        if discount < Decimal::ZERO || discount > Decimal::ONE {
            return Err(ConfigError::DiscountOutOfRange {
                addon: addon.to_string(),
                tier: tier.to_string(),
            });
        }
    }

    Ok(AddonPrice {
        base_price: config.base_price,
        discounts: TierDiscounts {
            none: config.discounts.none,
            basic: config.discounts.basic,
            standard: config.discounts.standard,
            full: config.discounts.full,
        },
    })
}

fn parse_class(path: &str, class: &str) -> Result<PathClass, ConfigError> {
    if class == "tier" {
        return Ok(PathClass::Tier);
    }
    if let Some(name) = class.strip_prefix("addon:") {
        if let Ok(addon) = name.parse::<Addon>() {
            return Ok(PathClass::Addon(addon));
        }
    }
    Err(ConfigError::UnknownPathClass {
        path: path.to_string(),
        class: class.to_string(),
    })
}

/// Serializable view of an account's effective subscription standing.
#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub account_id: String,
    pub tier: Tier,
    pub vip: bool,
    /// Unix seconds, when an expiration is recorded.
    pub expires_at: Option<i64>,
    pub addons: Vec<AddonCost>,
    pub benefits: BenefitSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddonCost {
    pub addon: Addon,
    pub monthly_cost: Decimal,
}
