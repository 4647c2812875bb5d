//! Counter persistence with an atomic conditional update.
//!
//! The store is keyed by `(account_id, counter)`. The compare-and-swap is
//! the concurrency primitive the whole tracker rests on: two simultaneous
//! consumers of the last slot race on the same row and exactly one wins.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::counter::CounterState;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("counter store database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load(&self, account_id: &str, counter: &str)
        -> Result<Option<CounterState>, StoreError>;

    /// Create the row if it does not exist yet. Losing a creation race is
    /// fine; the caller re-reads afterwards.
    async fn init(
        &self,
        account_id: &str,
        counter: &str,
        state: CounterState,
    ) -> Result<(), StoreError>;

    /// Atomically replace `expected` with `new`. Returns `false` when the
    /// stored state no longer matches `expected` (race lost).
    async fn compare_and_swap(
        &self,
        account_id: &str,
        counter: &str,
        expected: CounterState,
        new: CounterState,
    ) -> Result<bool, StoreError>;

    /// Unconditional overwrite, used only by the explicit administrative
    /// reset.
    async fn overwrite(
        &self,
        account_id: &str,
        counter: &str,
        state: CounterState,
    ) -> Result<(), StoreError>;

    /// Reset every row of `counter` whose window has elapsed. Returns the
    /// number of rows swept.
    async fn sweep(&self, counter: &str, current_window_start: i64) -> Result<u64, StoreError>;
}

/// SQLite-backed store over the `quota_counters` table.
#[derive(Debug, Clone)]
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn load(
        &self,
        account_id: &str,
        counter: &str,
    ) -> Result<Option<CounterState>, StoreError> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT count, window_start FROM quota_counters
             WHERE account_id = ?1 AND counter = ?2",
        )
        .bind(account_id)
        .bind(counter)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(count, window_start)| CounterState {
            count,
            window_start,
        }))
    }

    async fn init(
        &self,
        account_id: &str,
        counter: &str,
        state: CounterState,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quota_counters (account_id, counter, count, window_start)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (account_id, counter) DO NOTHING",
        )
        .bind(account_id)
        .bind(counter)
        .bind(state.count)
        .bind(state.window_start)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn compare_and_swap(
        &self,
        account_id: &str,
        counter: &str,
        expected: CounterState,
        new: CounterState,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE quota_counters
             SET count = ?5, window_start = ?6
             WHERE account_id = ?1 AND counter = ?2
               AND count = ?3 AND window_start = ?4",
        )
        .bind(account_id)
        .bind(counter)
        .bind(expected.count)
        .bind(expected.window_start)
        .bind(new.count)
        .bind(new.window_start)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn overwrite(
        &self,
        account_id: &str,
        counter: &str,
        state: CounterState,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quota_counters (account_id, counter, count, window_start)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (account_id, counter)
             DO UPDATE SET count = excluded.count, window_start = excluded.window_start",
        )
        .bind(account_id)
        .bind(counter)
        .bind(state.count)
        .bind(state.window_start)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn sweep(&self, counter: &str, current_window_start: i64) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE quota_counters
             SET count = 0, window_start = ?2
             WHERE counter = ?1 AND window_start < ?2",
        )
        .bind(counter)
        .bind(current_window_start)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
