//! Benefit defaults, per-account overrides and the merged effective view.
//!
//! The override document comes from the administrative surface and is
//! untrusted. Validation happens here, field by field: bad fields are
//! dropped and reported as diagnostics, the rest of the merge proceeds. A
//! request is never blocked by a malformed override.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::addon::Addon;
use crate::tier::Tier;

/// Named, rate-limited benefits.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BenefitName {
    DailyDownloads,
    PackRequests,
    PlaylistExports,
}

/// Tier default for one benefit. `limit: None` means unlimited.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BenefitDefault {
    pub enabled: bool,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Default benefit table for one tier.
#[derive(Debug, Clone, Deserialize)]
pub struct TierBenefits {
    pub daily_downloads: BenefitDefault,
    pub pack_requests: BenefitDefault,
    pub playlist_exports: BenefitDefault,
}

impl TierBenefits {
    pub fn get(&self, name: BenefitName) -> BenefitDefault {
        match name {
            BenefitName::DailyDownloads => self.daily_downloads,
            BenefitName::PackRequests => self.pack_requests,
            BenefitName::PlaylistExports => self.playlist_exports,
        }
    }

    fn disabled() -> Self {
        let off = BenefitDefault {
            enabled: false,
            limit: Some(0),
        };
        Self {
            daily_downloads: off,
            pack_requests: off,
            playlist_exports: off,
        }
    }
}

/// The full per-tier default table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenefitDefaults {
    pub none: TierBenefits,
    pub basic: TierBenefits,
    pub standard: TierBenefits,
    pub full: TierBenefits,
}

impl BenefitDefaults {
    pub fn for_tier(&self, tier: Tier) -> &TierBenefits {
        match tier {
            Tier::None => &self.none,
            Tier::Basic => &self.basic,
            Tier::Standard => &self.standard,
            Tier::Full => &self.full,
        }
    }
}

impl Default for BenefitDefaults {
    fn default() -> Self {
        Self {
            none: TierBenefits::disabled(),
            basic: TierBenefits {
                daily_downloads: BenefitDefault {
                    enabled: true,
                    limit: Some(25),
                },
                pack_requests: BenefitDefault {
                    enabled: true,
                    limit: Some(2),
                },
                playlist_exports: BenefitDefault {
                    enabled: true,
                    limit: Some(4),
                },
            },
            standard: TierBenefits {
                daily_downloads: BenefitDefault {
                    enabled: true,
                    limit: Some(100),
                },
                pack_requests: BenefitDefault {
                    enabled: true,
                    limit: Some(5),
                },
                playlist_exports: BenefitDefault {
                    enabled: true,
                    limit: Some(8),
                },
            },
            full: TierBenefits {
                daily_downloads: BenefitDefault {
                    enabled: true,
                    limit: None,
                },
                pack_requests: BenefitDefault {
                    enabled: true,
                    limit: Some(10),
                },
                playlist_exports: BenefitDefault {
                    enabled: true,
                    limit: Some(20),
                },
            },
        }
    }
}

/// Current counter values from the quota tracker. Overrides never set these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaUsage {
    pub daily_downloads: u32,
    pub pack_requests: u32,
    pub playlist_exports: u32,
}

impl QuotaUsage {
    pub fn get(&self, name: BenefitName) -> u32 {
        match name {
            BenefitName::DailyDownloads => self.daily_downloads,
            BenefitName::PackRequests => self.pack_requests,
            BenefitName::PlaylistExports => self.playlist_exports,
        }
    }
}

/// One merged, effective benefit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Benefit {
    pub enabled: bool,
    /// `None` means unlimited.
    pub limit: Option<u32>,
    pub used: u32,
    /// `None` means unlimited. Always `Some(0)` when the benefit is
    /// disabled.
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The merged, effective view consumed by the access decision point and the
/// profile/admin surfaces. Derived per request, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct BenefitSet {
    pub benefits: BTreeMap<BenefitName, Benefit>,
    pub extraction: bool,
    pub streaming: bool,
    pub uploader: bool,
}

impl BenefitSet {
    pub fn get(&self, name: BenefitName) -> &Benefit {
        &self.benefits[&name]
    }
}

/// Structured warning produced while validating an override document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedDocument,
    UnknownBenefit,
    InvalidField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub field: String,
    pub message: String,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validated override for one benefit. The outer `Option` on `limit` marks
/// whether the field was present; an explicit JSON `null` lifts the limit
/// entirely (unlimited).
#[derive(Debug, Default)]
struct ValidatedOverride {
    enabled: Option<bool>,
    limit: Option<Option<u32>>,
    description: Option<String>,
}

/// Merge tier defaults, account overrides and current usage into the
/// effective benefit set. Deterministic; no I/O.
pub fn merge_benefits(
    tier: Tier,
    addons: &BTreeSet<Addon>,
    overrides: Option<&str>,
    usage: &QuotaUsage,
    defaults: &BenefitDefaults,
) -> (BenefitSet, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let overrides = parse_overrides(overrides, &mut diagnostics);
    let table = defaults.for_tier(tier);

    let mut benefits = BTreeMap::new();
    for name in BenefitName::iter() {
        let default = table.get(name);
        let mut enabled = default.enabled;
        let mut limit = default.limit;
        let mut description = None;

        if let Some(over) = overrides.get(&name) {
            if let Some(value) = over.enabled {
                enabled = value;
            }
            if let Some(value) = over.limit {
                limit = value;
            }
            if let Some(value) = &over.description {
                description = Some(value.clone());
            }
        }

        let used = usage.get(name);
        let remaining = if enabled {
            limit.map(|limit| limit.saturating_sub(used))
        } else {
            Some(0)
        };

        benefits.insert(
            name,
            Benefit {
                enabled,
                limit,
                used,
                remaining,
                description,
            },
        );
    }

    let set = BenefitSet {
        benefits,
        extraction: addons.contains(&Addon::Extraction),
        streaming: addons.contains(&Addon::Streaming),
        uploader: addons.contains(&Addon::Uploader),
    };

    (set, diagnostics)
}

/// Validation pass over the raw override document. Every problem becomes a
/// diagnostic; nothing here returns an error.
fn parse_overrides(
    raw: Option<&str>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<BenefitName, ValidatedOverride> {
    let mut overrides = BTreeMap::new();

    let Some(raw) = raw else {
        return overrides;
    };

    let document: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedDocument,
                "benefit_overrides",
                format!("override document is not valid JSON: {err}"),
            ));
            return overrides;
        }
    };

    let Some(entries) = document.as_object() else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MalformedDocument,
            "benefit_overrides",
            "override document must be a JSON object",
        ));
        return overrides;
    };

    for (key, value) in entries {
        let Ok(name) = key.parse::<BenefitName>() else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownBenefit,
                key.clone(),
                "unknown benefit name, override ignored",
            ));
            continue;
        };

        let Some(fields) = value.as_object() else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidField,
                key.clone(),
                "override entry must be a JSON object",
            ));
            continue;
        };

        let mut validated = ValidatedOverride::default();

        if let Some(enabled) = fields.get("enabled") {
            match enabled.as_bool() {
                Some(value) => validated.enabled = Some(value),
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InvalidField,
                    format!("{key}.enabled"),
                    "enabled must be a boolean, override dropped",
                )),
            }
        }

        if let Some(limit) = fields.get("limit") {
            if limit.is_null() {
                validated.limit = Some(None);
            } else {
                match limit.as_u64().and_then(|value| u32::try_from(value).ok()) {
                    Some(value) => validated.limit = Some(Some(value)),
                    None => diagnostics.push(Diagnostic::new(
                        DiagnosticKind::InvalidField,
                        format!("{key}.limit"),
                        "limit must be a non-negative integer, override dropped",
                    )),
                }
            }
        }

        if let Some(description) = fields.get("description") {
            match description.as_str() {
                Some(value) => validated.description = Some(value.to_string()),
                None => diagnostics.push(Diagnostic::new(
                    DiagnosticKind::InvalidField,
                    format!("{key}.description"),
                    "description must be a string, override dropped",
                )),
            }
        }

        overrides.insert(name, validated);
    }

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(overrides: Option<&str>, usage: QuotaUsage) -> (BenefitSet, Vec<Diagnostic>) {
        merge_benefits(
            Tier::Standard,
            &BTreeSet::new(),
            overrides,
            &usage,
            &BenefitDefaults::default(),
        )
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let (set, diagnostics) = merge(None, QuotaUsage::default());
        assert!(diagnostics.is_empty());
        assert_eq!(set.get(BenefitName::PackRequests).limit, Some(5));
        assert_eq!(set.get(BenefitName::PlaylistExports).limit, Some(8));
        assert_eq!(set.get(BenefitName::DailyDownloads).limit, Some(100));
    }

    #[test]
    fn override_raises_limit() {
        let (set, diagnostics) = merge(
            Some(r#"{"pack_requests": {"limit": 8}}"#),
            QuotaUsage::default(),
        );
        assert!(diagnostics.is_empty());
        assert_eq!(set.get(BenefitName::PackRequests).limit, Some(8));
        // Untouched benefits keep their tier defaults.
        assert_eq!(set.get(BenefitName::PlaylistExports).limit, Some(8));
    }

    #[test]
    fn negative_limit_is_dropped_with_diagnostic() {
        let (set, diagnostics) = merge(
            Some(r#"{"pack_requests": {"limit": -3}}"#),
            QuotaUsage::default(),
        );
        assert_eq!(set.get(BenefitName::PackRequests).limit, Some(5));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::InvalidField);
        assert_eq!(diagnostics[0].field, "pack_requests.limit");
    }

    #[test]
    fn null_limit_means_unlimited() {
        let (set, diagnostics) = merge(
            Some(r#"{"daily_downloads": {"limit": null}}"#),
            QuotaUsage::default(),
        );
        assert!(diagnostics.is_empty());
        assert_eq!(set.get(BenefitName::DailyDownloads).limit, None);
        assert_eq!(set.get(BenefitName::DailyDownloads).remaining, None);
    }

    #[test]
    fn unknown_benefit_is_ignored_with_diagnostic() {
        let (set, diagnostics) = merge(
            Some(r#"{"karaoke_nights": {"limit": 3}, "pack_requests": {"limit": 6}}"#),
            QuotaUsage::default(),
        );
        assert_eq!(set.get(BenefitName::PackRequests).limit, Some(6));
        assert!(!set.benefits.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownBenefit);
        assert_eq!(diagnostics[0].field, "karaoke_nights");
    }

    #[test]
    fn malformed_document_falls_back_to_defaults() {
        let (set, diagnostics) = merge(Some("{not json"), QuotaUsage::default());
        assert_eq!(set.get(BenefitName::PackRequests).limit, Some(5));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MalformedDocument);
    }

    #[test]
    fn bad_field_is_dropped_but_rest_of_entry_survives() {
        let (set, diagnostics) = merge(
            Some(r#"{"pack_requests": {"enabled": "yes", "limit": 7}}"#),
            QuotaUsage::default(),
        );
        let benefit = set.get(BenefitName::PackRequests);
        assert!(benefit.enabled);
        assert_eq!(benefit.limit, Some(7));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].field, "pack_requests.enabled");
    }

    #[test]
    fn used_comes_from_the_quota_tracker_not_the_override() {
        let usage = QuotaUsage {
            pack_requests: 3,
            ..QuotaUsage::default()
        };
        let (set, _) = merge(Some(r#"{"pack_requests": {"limit": 8}}"#), usage);
        let benefit = set.get(BenefitName::PackRequests);
        assert_eq!(benefit.used, 3);
        assert_eq!(benefit.remaining, Some(5));
    }

    #[test]
    fn disabled_benefit_reports_zero_remaining() {
        let (set, _) = merge(
            Some(r#"{"pack_requests": {"enabled": false}}"#),
            QuotaUsage::default(),
        );
        let benefit = set.get(BenefitName::PackRequests);
        assert!(!benefit.enabled);
        assert_eq!(benefit.remaining, Some(0));
    }

    #[test]
    fn addon_booleans_mirror_the_active_set() {
        let mut addons = BTreeSet::new();
        addons.insert(Addon::Uploader);
        let (set, _) = merge_benefits(
            Tier::None,
            &addons,
            None,
            &QuotaUsage::default(),
            &BenefitDefaults::default(),
        );
        assert!(set.uploader);
        assert!(!set.extraction);
        assert!(!set.streaming);
    }
}
