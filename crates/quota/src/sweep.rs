//! Scheduled sweep wiring.
//!
//! An external scheduler periodically resets counters with elapsed windows
//! so dormant accounts don't hold stale state forever. The tracker stays
//! correct if this never runs: every read applies check-and-reset itself.

use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::service::QuotaService;

/// Build a scheduler running the sweep on the given cron schedule
/// (six-field cron, seconds first). The caller starts it.
pub async fn scheduler(
    service: QuotaService,
    schedule: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;

    sched
        .add(Job::new_async(schedule, move |_uuid, _lock| {
            let service = service.clone();
            Box::pin(async move {
                if let Err(err) = service.sweep(OffsetDateTime::now_utc()).await {
                    tracing::error!(error = %err, "scheduled quota sweep failed");
                }
            })
        })?)
        .await?;

    Ok(sched)
}
