//! Web server assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use trackpool_entitlement::Engine;

use crate::config::Config;
use crate::routes::{router, AppState};
use crate::{db, quotas};

/// Build application state: database pool, compiled entitlement engine and
/// quota service. Fails on any configuration error before binding a socket.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let pool = db::create_pool(&config.database.url, config.database.max_connections).await?;

    let engine = Engine::from_config(&config.entitlement)?;
    let quota = quotas::build_quota_service(pool.clone(), &config)?;

    Ok(AppState {
        config,
        pool,
        engine: Arc::new(engine),
        quota,
    })
}

/// Start the HTTP server and the scheduled quota sweep.
pub async fn serve(config: Config, host: String, port: u16) -> anyhow::Result<()> {
    let state = build_state(config).await?;

    // The sweep is an optimization; check-and-reset-on-read keeps counters
    // correct even if the scheduler never fires.
    let scheduler = trackpool_quota::sweep::scheduler(
        state.quota.clone(),
        &state.config.quota.sweep_schedule,
    )
    .await
    .map_err(|err| anyhow::anyhow!("failed to schedule quota sweep: {err}"))?;
    scheduler
        .start()
        .await
        .map_err(|err| anyhow::anyhow!("failed to start quota sweep scheduler: {err}"))?;

    let app = router(state);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
