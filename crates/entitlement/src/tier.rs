//! Tier resolution from payment state.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Subscription tier derived from payment state.
///
/// Ordering is meaningful: `None < Basic < Standard < Full`. Resolution is
/// non-decreasing in the stored monetary value.
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
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tier {
    None,
    Basic,
    Standard,
    Full,
}

impl Tier {
    pub fn is_paying(self) -> bool {
        self != Tier::None
    }
}

/// Validated threshold table. Built by [`crate::Engine::from_config`], which
/// rejects non-increasing thresholds before any resolution can happen.
#[derive(Debug, Clone)]
pub struct TierTable {
    basic: Decimal,
    standard: Decimal,
    full: Decimal,
    /// Exact-value pins applied before the general rule. Operator-visible
    /// configuration data, empty unless deliberately set.
    pins: BTreeMap<Decimal, Tier>,
}

impl TierTable {
    pub(crate) fn new(
        basic: Decimal,
        standard: Decimal,
        full: Decimal,
        pins: BTreeMap<Decimal, Tier>,
    ) -> Self {
        Self {
            basic,
            standard,
            full,
            pins,
        }
    }

    /// Resolve the effective tier for an account's payment state at `now`.
    ///
    /// Precedence: explicit VIP grant, then expiration, then exact-value
    /// pins, then the inclusive threshold ladder. A stored value equal to a
    /// threshold resolves to the higher tier.
    pub fn resolve(
        &self,
        stored_value: Option<Decimal>,
        vip: bool,
        expires_at: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Tier {
        if vip {
            // An explicit operator grant wins over both an expired payment
            // record and the threshold math.
            return Tier::Full;
        }

        if let Some(expires_at) = expires_at {
            if expires_at < now {
                return Tier::None;
            }
        }

        let Some(value) = stored_value else {
            return Tier::None;
        };

        if let Some(pinned) = self.pins.get(&value) {
            return *pinned;
        }

        if value >= self.full {
            Tier::Full
        } else if value >= self.standard {
            Tier::Standard
        } else if value >= self.basic {
            Tier::Basic
        } else {
            Tier::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn table() -> TierTable {
        TierTable::new(
            "20".parse().unwrap(),
            "35".parse().unwrap(),
            "60".parse().unwrap(),
            BTreeMap::new(),
        )
    }

    fn now() -> OffsetDateTime {
        datetime!(2026-08-07 12:00:00 UTC)
    }

    fn resolve(value: &str) -> Tier {
        table().resolve(Some(value.parse().unwrap()), false, None, now())
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(resolve("19.99"), Tier::None);
        assert_eq!(resolve("20"), Tier::Basic);
        assert_eq!(resolve("20.01"), Tier::Basic);
        assert_eq!(resolve("34.99"), Tier::Basic);
        assert_eq!(resolve("35"), Tier::Standard);
        assert_eq!(resolve("35.01"), Tier::Standard);
        assert_eq!(resolve("59.99"), Tier::Standard);
        assert_eq!(resolve("60"), Tier::Full);
        assert_eq!(resolve("60.01"), Tier::Full);
    }

    #[test]
    fn resolution_is_monotonic_in_value() {
        let mut previous = Tier::None;
        let mut cents = Decimal::ZERO;
        let step: Decimal = "0.25".parse().unwrap();
        while cents < "100".parse().unwrap() {
            let tier = table().resolve(Some(cents), false, None, now());
            assert!(tier >= previous, "tier decreased at {cents}");
            previous = tier;
            cents += step;
        }
    }

    #[test]
    fn missing_value_resolves_to_none() {
        assert_eq!(table().resolve(None, false, None, now()), Tier::None);
    }

    #[test]
    fn expiration_dominates_any_qualifying_value() {
        let yesterday = datetime!(2026-08-06 12:00:00 UTC);
        for value in ["20", "38", "42", "60", "500"] {
            let tier = table().resolve(Some(value.parse().unwrap()), false, Some(yesterday), now());
            assert_eq!(tier, Tier::None, "expired account at {value} must be none");
        }
    }

    #[test]
    fn future_expiration_does_not_demote() {
        let tomorrow = datetime!(2026-08-08 12:00:00 UTC);
        let tier = table().resolve(Some("42".parse().unwrap()), false, Some(tomorrow), now());
        assert_eq!(tier, Tier::Standard);
    }

    #[test]
    fn vip_grant_overrides_expiration_and_value() {
        let yesterday = datetime!(2026-08-06 12:00:00 UTC);
        assert_eq!(table().resolve(None, true, None, now()), Tier::Full);
        assert_eq!(
            table().resolve(Some("1".parse().unwrap()), true, Some(yesterday), now()),
            Tier::Full
        );
    }

    #[test]
    fn exact_value_pin_wins_over_threshold_ladder() {
        let mut pins = BTreeMap::new();
        pins.insert("49.99".parse().unwrap(), Tier::Full);
        let table = TierTable::new(
            "20".parse().unwrap(),
            "35".parse().unwrap(),
            "60".parse().unwrap(),
            pins,
        );

        let pinned = table.resolve(Some("49.99".parse().unwrap()), false, None, now());
        assert_eq!(pinned, Tier::Full);

        // Neighbouring values still follow the general rule.
        let neighbour = table.resolve(Some("49.98".parse().unwrap()), false, None, now());
        assert_eq!(neighbour, Tier::Standard);
    }
}
