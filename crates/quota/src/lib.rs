//! Quota tracker for trackpool.
//!
//! Per-account counters for rate-limited actions, each bound to a daily or
//! weekly reset window in the platform's reference timezone. The only
//! mutable shared state in the engine lives here, behind a compare-and-swap
//! store keyed by `(account_id, counter)` so that different accounts and
//! different counters never contend.
//!
//! Correctness never depends on the scheduled sweep: every read applies
//! check-and-reset before deciding anything.

pub mod counter;
pub mod service;
pub mod store;
pub mod sweep;
pub mod window;

pub use counter::{check_and_reset, CounterState};
pub use service::{CounterDef, Denial, Grant, QuotaOptions, QuotaService};
pub use store::{CounterStore, SqliteCounterStore, StoreError};
pub use window::{WindowError, WindowKind, Windows};
