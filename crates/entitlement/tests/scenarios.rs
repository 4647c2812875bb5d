//! End-to-end scenarios over the compiled engine.

use time::macros::datetime;
use trackpool_entitlement::{
    Account, AddonFlags, Addon, BenefitName, Decision, DenyReason, Engine, EntitlementConfig,
    QuotaUsage, Tier,
};

fn engine() -> Engine {
    Engine::from_config(&EntitlementConfig::default()).expect("default config compiles")
}

fn now() -> time::OffsetDateTime {
    datetime!(2026-08-07 15:00:00 UTC)
}

#[test]
fn paying_account_gets_standard_tier_and_default_limits() {
    // storedMonetaryValue 42, no expiration, no overrides.
    let account = Account {
        stored_value: Some("42".parse().unwrap()),
        ..Account::test_fixture("acc_a")
    };

    let engine = engine();
    assert_eq!(engine.resolve_tier(&account, now()), Tier::Standard);

    let (benefits, diagnostics) = engine.merge_benefits(&account, &QuotaUsage::default(), now());
    assert!(diagnostics.is_empty());
    assert_eq!(benefits.get(BenefitName::PackRequests).limit, Some(5));
    assert_eq!(benefits.get(BenefitName::PackRequests).used, 0);
}

#[test]
fn lapsed_account_is_denied_with_tier_reason() {
    // storedMonetaryValue 38, expired yesterday, no vip grant.
    let account = Account {
        stored_value: Some("38".parse().unwrap()),
        expires_at: Some(datetime!(2026-08-06 15:00:00 UTC)),
        ..Account::test_fixture("acc_b")
    };

    let engine = engine();
    assert_eq!(engine.resolve_tier(&account, now()), Tier::None);
    assert_eq!(
        engine.decide(&account, "/api/downloads/tr_1", now()),
        Decision::Deny(DenyReason::Tier)
    );
}

#[test]
fn uploader_addon_works_without_a_paying_tier() {
    let account = Account {
        addons: AddonFlags {
            uploader: true,
            ..AddonFlags::default()
        },
        ..Account::test_fixture("acc_c")
    };

    let engine = engine();
    assert_eq!(engine.resolve_tier(&account, now()), Tier::None);
    assert_eq!(engine.decide(&account, "/api/uploads", now()), Decision::Allow);
    assert_eq!(
        engine.decide(&account, "/api/downloads/tr_1", now()),
        Decision::Deny(DenyReason::Tier)
    );
}

#[test]
fn standing_prices_addons_at_the_resolved_tier() {
    let account = Account {
        stored_value: Some("60".parse().unwrap()),
        addons: AddonFlags {
            extraction: true,
            streaming: true,
            uploader: false,
        },
        ..Account::test_fixture("acc_d")
    };

    let engine = engine();
    let (standing, diagnostics) = engine.standing(&account, &QuotaUsage::default(), now());
    assert!(diagnostics.is_empty());
    assert_eq!(standing.tier, Tier::Full);
    assert_eq!(standing.addons.len(), 2);

    // Full tier gets the 50% discount off the 10.00 base price.
    let extraction = standing
        .addons
        .iter()
        .find(|cost| cost.addon == Addon::Extraction)
        .unwrap();
    assert_eq!(extraction.monthly_cost, "5.00".parse().unwrap());
}

#[test]
fn operator_override_takes_effect_with_diagnostics_preserved() {
    let account = Account {
        stored_value: Some("42".parse().unwrap()),
        benefit_overrides: Some(
            r#"{"pack_requests": {"limit": 8}, "mystery": {"limit": 1}}"#.to_string(),
        ),
        ..Account::test_fixture("acc_e")
    };

    let engine = engine();
    let (standing, diagnostics) = engine.standing(&account, &QuotaUsage::default(), now());
    assert_eq!(
        standing.benefits.get(BenefitName::PackRequests).limit,
        Some(8)
    );
    assert_eq!(diagnostics.len(), 1);
}
