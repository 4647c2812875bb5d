//! Check-and-increment service over the counter store.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::counter::{check_and_reset, CounterState};
use crate::store::{CounterStore, StoreError};
use crate::window::{WindowKind, Windows};

/// A registered counter and the window kind it is bound to.
#[derive(Debug, Clone)]
pub struct CounterDef {
    pub name: String,
    pub kind: WindowKind,
}

impl CounterDef {
    pub fn new(name: impl Into<String>, kind: WindowKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaOptions {
    /// Bound on read-modify-write retries after lost compare-and-swap
    /// races. Exhaustion is reported as [`Denial::Unavailable`].
    pub cas_retries: u32,
    /// Per-operation persistence timeout. Elapsing means denied, never
    /// silently granted.
    pub op_timeout: Duration,
}

impl Default for QuotaOptions {
    fn default() -> Self {
        Self {
            cas_retries: 5,
            op_timeout: Duration::from_secs(2),
        }
    }
}

/// Successful consumption: the new count and what is left in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub count: i64,
    /// `None` for unlimited counters.
    pub remaining: Option<i64>,
}

/// Why a consumption was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The window's limit is spent.
    Quota { resets_at: OffsetDateTime },
    /// Persistence failed, timed out, or retries ran out. Fail closed.
    Unavailable,
}

impl Denial {
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::Quota { .. } => "quota",
            Denial::Unavailable => "unavailable",
        }
    }
}

/// The quota tracker. Cheap to clone; the store is shared.
#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn CounterStore>,
    windows: Windows,
    counters: Arc<Vec<CounterDef>>,
    options: QuotaOptions,
}

impl QuotaService {
    pub fn new(
        store: Arc<dyn CounterStore>,
        windows: Windows,
        counters: Vec<CounterDef>,
        options: QuotaOptions,
    ) -> Self {
        Self {
            store,
            windows,
            counters: Arc::new(counters),
            options,
        }
    }

    pub fn windows(&self) -> &Windows {
        &self.windows
    }

    pub fn def(&self, counter: &str) -> Option<&CounterDef> {
        self.counters.iter().find(|def| def.name == counter)
    }

    /// Check-and-increment one counter for one account.
    ///
    /// Applies check-and-reset first, then consumes a slot if the limit
    /// allows. Atomic with respect to concurrent callers on the same
    /// `(account_id, counter)`: the compare-and-swap admits exactly one
    /// writer per observed state, losers retry against fresh state.
    pub async fn try_consume(
        &self,
        account_id: &str,
        counter: &str,
        limit: Option<u32>,
        now: OffsetDateTime,
    ) -> Result<Grant, Denial> {
        let Some(def) = self.def(counter) else {
            tracing::error!(counter, "try_consume on unregistered counter");
            return Err(Denial::Unavailable);
        };

        let window_start = self.windows.window_start(def.kind, now);
        let window_start_ts = window_start.unix_timestamp();
        let resets_at = window_start + self.windows.window_length(def.kind);

        let attempt = self.consume_loop(account_id, &def.name, limit, window_start_ts, resets_at);

        match tokio::time::timeout(self.options.op_timeout, attempt).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::error!(account_id, counter, error = %err, "quota check failed, denying");
                Err(Denial::Unavailable)
            }
            Err(_) => {
                tracing::warn!(account_id, counter, "quota check timed out, denying");
                Err(Denial::Unavailable)
            }
        }
    }

    async fn consume_loop(
        &self,
        account_id: &str,
        counter: &str,
        limit: Option<u32>,
        window_start_ts: i64,
        resets_at: OffsetDateTime,
    ) -> Result<Result<Grant, Denial>, StoreError> {
        for attempt in 0..self.options.cas_retries {
            let stored = match self.store.load(account_id, counter).await? {
                Some(state) => state,
                None => {
                    let fresh = CounterState::fresh(window_start_ts);
                    self.store.init(account_id, counter, fresh).await?;
                    // Re-read: another caller may have won the creation race
                    // and already consumed.
                    self.store
                        .load(account_id, counter)
                        .await?
                        .unwrap_or(fresh)
                }
            };

            let effective = check_and_reset(stored, window_start_ts);

            if let Some(limit) = limit {
                if effective.count >= i64::from(limit) {
                    return Ok(Err(Denial::Quota { resets_at }));
                }
            }

            let next = CounterState {
                count: effective.count + 1,
                window_start: effective.window_start,
            };

            if self
                .store
                .compare_and_swap(account_id, counter, stored, next)
                .await?
            {
                let remaining = limit.map(|limit| i64::from(limit) - next.count);
                return Ok(Ok(Grant {
                    count: next.count,
                    remaining,
                }));
            }

            tracing::debug!(account_id, counter, attempt, "lost counter race, retrying");
        }

        tracing::warn!(account_id, counter, "counter retries exhausted, denying");
        Ok(Err(Denial::Unavailable))
    }

    /// Effective count for one counter without consuming. A stale window
    /// reads as zero; nothing is written.
    pub async fn peek(
        &self,
        account_id: &str,
        counter: &str,
        now: OffsetDateTime,
    ) -> Result<u32, StoreError> {
        let Some(def) = self.def(counter) else {
            return Ok(0);
        };
        let window_start = self.windows.window_start(def.kind, now).unix_timestamp();
        let count = match self.store.load(account_id, &def.name).await? {
            Some(state) => check_and_reset(state, window_start).count,
            None => 0,
        };
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Effective counts for every registered counter.
    pub async fn usage(
        &self,
        account_id: &str,
        now: OffsetDateTime,
    ) -> Result<BTreeMap<String, u32>, StoreError> {
        let mut usage = BTreeMap::new();
        for def in self.counters.iter() {
            let count = self.peek(account_id, &def.name, now).await?;
            usage.insert(def.name.clone(), count);
        }
        Ok(usage)
    }

    /// Explicit administrative reset: the one sanctioned decrement.
    pub async fn reset(
        &self,
        account_id: &str,
        counter: &str,
        now: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let Some(def) = self.def(counter) else {
            tracing::warn!(counter, "reset on unregistered counter ignored");
            return Ok(());
        };
        let window_start = self.windows.window_start(def.kind, now).unix_timestamp();
        self.store
            .overwrite(account_id, &def.name, CounterState::fresh(window_start))
            .await
    }

    /// Proactive reset of all counters with elapsed windows. Purely an
    /// optimization over check-and-reset-on-read.
    pub async fn sweep(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut swept = 0;
        for def in self.counters.iter() {
            let window_start = self.windows.window_start(def.kind, now).unix_timestamp();
            swept += self.store.sweep(&def.name, window_start).await?;
        }
        if swept > 0 {
            tracing::info!(swept, "quota sweep reset elapsed windows");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Windows;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use time::macros::datetime;

    /// In-memory store for exercising the service logic without SQLite.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<(String, String), CounterState>>,
        fail_cas: bool,
        fail_load: bool,
    }

    #[async_trait::async_trait]
    impl CounterStore for MemoryStore {
        async fn load(
            &self,
            account_id: &str,
            counter: &str,
        ) -> Result<Option<CounterState>, StoreError> {
            if self.fail_load {
                return Err(StoreError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .get(&(account_id.to_string(), counter.to_string()))
                .copied())
        }

        async fn init(
            &self,
            account_id: &str,
            counter: &str,
            state: CounterState,
        ) -> Result<(), StoreError> {
            self.rows
                .lock()
                .unwrap()
                .entry((account_id.to_string(), counter.to_string()))
                .or_insert(state);
            Ok(())
        }

        async fn compare_and_swap(
            &self,
            account_id: &str,
            counter: &str,
            expected: CounterState,
            new: CounterState,
        ) -> Result<bool, StoreError> {
            if self.fail_cas {
                return Ok(false);
            }
            let mut rows = self.rows.lock().unwrap();
            let key = (account_id.to_string(), counter.to_string());
            match rows.get(&key) {
                Some(state) if *state == expected => {
                    rows.insert(key, new);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn overwrite(
            &self,
            account_id: &str,
            counter: &str,
            state: CounterState,
        ) -> Result<(), StoreError> {
            self.rows
                .lock()
                .unwrap()
                .insert((account_id.to_string(), counter.to_string()), state);
            Ok(())
        }

        async fn sweep(&self, counter: &str, current_window_start: i64) -> Result<u64, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let mut swept = 0;
            for ((_, name), state) in rows.iter_mut() {
                if name == counter && state.window_start < current_window_start {
                    *state = CounterState::fresh(current_window_start);
                    swept += 1;
                }
            }
            Ok(swept)
        }
    }

    fn service_with(store: MemoryStore) -> QuotaService {
        QuotaService::new(
            Arc::new(store),
            Windows::new("America/New_York", "sunday", 0).unwrap(),
            vec![
                CounterDef::new("daily_downloads", WindowKind::Daily),
                CounterDef::new("pack_requests", WindowKind::Weekly),
            ],
            QuotaOptions::default(),
        )
    }

    fn now() -> OffsetDateTime {
        datetime!(2026-08-07 15:00:00 UTC)
    }

    #[tokio::test]
    async fn consumes_until_the_limit_then_denies() {
        let service = service_with(MemoryStore::default());

        for expected in 1..=3 {
            let grant = service
                .try_consume("acc_1", "pack_requests", Some(3), now())
                .await
                .unwrap();
            assert_eq!(grant.count, expected);
            assert_eq!(grant.remaining, Some(3 - expected));
        }

        let denied = service
            .try_consume("acc_1", "pack_requests", Some(3), now())
            .await
            .unwrap_err();
        assert!(matches!(denied, Denial::Quota { .. }));
        assert_eq!(denied.reason(), "quota");
    }

    #[tokio::test]
    async fn unlimited_counters_still_count() {
        let service = service_with(MemoryStore::default());
        for expected in 1..=5 {
            let grant = service
                .try_consume("acc_1", "daily_downloads", None, now())
                .await
                .unwrap();
            assert_eq!(grant.count, expected);
            assert_eq!(grant.remaining, None);
        }
    }

    #[tokio::test]
    async fn exhausted_counter_rolls_over_after_the_window() {
        let store = MemoryStore::default();
        // Exhausted counter whose window started two days ago.
        let stale_start = datetime!(2026-08-05 04:00:00 UTC).unix_timestamp();
        store.rows.lock().unwrap().insert(
            ("acc_1".to_string(), "daily_downloads".to_string()),
            CounterState {
                count: 25,
                window_start: stale_start,
            },
        );

        let service = service_with(store);
        let grant = service
            .try_consume("acc_1", "daily_downloads", Some(25), now())
            .await
            .unwrap();
        assert_eq!(grant.count, 1);
        assert_eq!(grant.remaining, Some(24));
    }

    #[tokio::test]
    async fn lost_races_exhaust_into_unavailable() {
        let store = MemoryStore {
            fail_cas: true,
            ..MemoryStore::default()
        };
        let service = service_with(store);
        let denied = service
            .try_consume("acc_1", "pack_requests", Some(3), now())
            .await
            .unwrap_err();
        assert_eq!(denied, Denial::Unavailable);
        assert_eq!(denied.reason(), "unavailable");
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let store = MemoryStore {
            fail_load: true,
            ..MemoryStore::default()
        };
        let service = service_with(store);
        let denied = service
            .try_consume("acc_1", "pack_requests", Some(3), now())
            .await
            .unwrap_err();
        assert_eq!(denied, Denial::Unavailable);
    }

    #[tokio::test]
    async fn unregistered_counter_fails_closed() {
        let service = service_with(MemoryStore::default());
        let denied = service
            .try_consume("acc_1", "mystery", Some(3), now())
            .await
            .unwrap_err();
        assert_eq!(denied, Denial::Unavailable);
    }

    #[tokio::test]
    async fn peek_reads_a_stale_window_as_zero() {
        let store = MemoryStore::default();
        let stale_start = datetime!(2026-07-01 04:00:00 UTC).unix_timestamp();
        store.rows.lock().unwrap().insert(
            ("acc_1".to_string(), "pack_requests".to_string()),
            CounterState {
                count: 5,
                window_start: stale_start,
            },
        );

        let service = service_with(store);
        assert_eq!(service.peek("acc_1", "pack_requests", now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn administrative_reset_zeroes_the_counter() {
        let service = service_with(MemoryStore::default());
        for _ in 0..3 {
            service
                .try_consume("acc_1", "pack_requests", Some(3), now())
                .await
                .unwrap();
        }
        assert!(service
            .try_consume("acc_1", "pack_requests", Some(3), now())
            .await
            .is_err());

        service.reset("acc_1", "pack_requests", now()).await.unwrap();
        let grant = service
            .try_consume("acc_1", "pack_requests", Some(3), now())
            .await
            .unwrap();
        assert_eq!(grant.count, 1);
    }

    #[tokio::test]
    async fn sweep_resets_only_elapsed_windows() {
        let store = MemoryStore::default();
        let stale_start = datetime!(2026-07-26 04:00:00 UTC).unix_timestamp();
        store.rows.lock().unwrap().insert(
            ("acc_old".to_string(), "pack_requests".to_string()),
            CounterState {
                count: 5,
                window_start: stale_start,
            },
        );

        let service = service_with(store);
        // Current window usage survives the sweep.
        service
            .try_consume("acc_new", "pack_requests", Some(5), now())
            .await
            .unwrap();

        let swept = service.sweep(now()).await.unwrap();
        assert_eq!(swept, 1);
        assert_eq!(service.peek("acc_old", "pack_requests", now()).await.unwrap(), 0);
        assert_eq!(service.peek("acc_new", "pack_requests", now()).await.unwrap(), 1);
    }
}
