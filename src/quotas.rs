//! Wiring between the benefit vocabulary and the quota tracker.

use std::collections::BTreeMap;
use std::sync::Arc;

use sqlx::SqlitePool;
use trackpool_entitlement::{BenefitName, QuotaUsage};
use trackpool_quota::{CounterDef, QuotaService, SqliteCounterStore, WindowKind};

use crate::config::Config;

/// The window kind each rate-limited benefit is bound to.
pub fn window_kind(benefit: BenefitName) -> WindowKind {
    match benefit {
        BenefitName::DailyDownloads => WindowKind::Daily,
        BenefitName::PackRequests => WindowKind::Weekly,
        BenefitName::PlaylistExports => WindowKind::Weekly,
    }
}

/// Counter registry: one counter per rate-limited benefit, named after it.
pub fn counter_defs() -> Vec<CounterDef> {
    use strum::IntoEnumIterator;

    BenefitName::iter()
        .map(|benefit| CounterDef::new(benefit.to_string(), window_kind(benefit)))
        .collect()
}

/// Build the quota service for the configured windows and store.
pub fn build_quota_service(pool: SqlitePool, config: &Config) -> anyhow::Result<QuotaService> {
    let windows = config.quota.windows()?;
    Ok(QuotaService::new(
        Arc::new(SqliteCounterStore::new(pool)),
        windows,
        counter_defs(),
        config.quota.options(),
    ))
}

/// Convert the tracker's per-counter usage map into the engine's view.
pub fn usage_from_counts(counts: &BTreeMap<String, u32>) -> QuotaUsage {
    let get = |benefit: BenefitName| counts.get(&benefit.to_string()).copied().unwrap_or(0);
    QuotaUsage {
        daily_downloads: get(BenefitName::DailyDownloads),
        pack_requests: get(BenefitName::PackRequests),
        playlist_exports: get(BenefitName::PlaylistExports),
    }
}
