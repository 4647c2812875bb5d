use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;
use trackpool_entitlement::{Account, BenefitName, Engine, QuotaUsage};
use trackpool_quota::{Denial, Grant, QuotaService};

use crate::config::Config;
use crate::error::AppError;

mod admin;
mod billing;
mod downloads;
mod extract;
mod health;
mod packs;
mod playlists;
mod profile;
mod streaming;
mod uploads;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
    pub engine: Arc<Engine>,
    pub quota: QuotaService,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    // Every /api route sits behind authentication plus the access decision
    // point. The gate allows unlisted paths through, so applying it across
    // the board is safe and keeps the protected-path set in configuration.
    let api = Router::new()
        .route("/api/profile", get(profile::standing))
        .route("/api/downloads/{track_id}", post(downloads::download))
        .route("/api/packs/request", post(packs::request))
        .route("/api/playlists/export", post(playlists::export))
        .route("/api/uploads", post(uploads::create))
        .route("/api/extract/{track_id}", post(extract::request))
        .route("/api/streaming/token", get(streaming::token))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::gate_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth_middleware,
        ));

    let admin = Router::new()
        .route(
            "/admin/accounts",
            get(admin::accounts::list).post(admin::accounts::create),
        )
        .route(
            "/admin/accounts/{id}",
            get(admin::accounts::show).put(admin::accounts::update),
        )
        .route(
            "/admin/accounts/{id}/quota/{counter}/reset",
            post(admin::accounts::reset_quota),
        )
        .route_layer(axum_middleware::from_fn(crate::middleware::admin_middleware))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth_middleware,
        ));

    // Authenticated by shared secret, not by session: the payment
    // collaborator is a machine.
    let billing = Router::new().route("/api/billing/events", post(billing::event));

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .merge(api)
        .merge(admin)
        .merge(billing)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Consume one slot of a rate-limited benefit for an account.
///
/// Resolves the effective limit first (tier defaults plus operator
/// overrides), then runs the tracker's check-and-increment. A disabled
/// benefit reads as a zero-slot window.
pub(crate) async fn consume_benefit(
    state: &AppState,
    account: &Account,
    benefit: BenefitName,
    now: OffsetDateTime,
) -> Result<Grant, AppError> {
    // Administrators bypass limits the same way they bypass path gating;
    // their usage is still counted.
    let limit = if account.is_admin {
        None
    } else {
        let (benefits, _) = state
            .engine
            .merge_benefits(account, &QuotaUsage::default(), now);
        let effective = benefits.get(benefit);

        if !effective.enabled {
            let kind = crate::quotas::window_kind(benefit);
            let resets_at = state.quota.windows().resets_at(kind, now);
            return Err(AppError::Quota(Denial::Quota { resets_at }));
        }

        effective.limit
    };

    state
        .quota
        .try_consume(&account.id, &benefit.to_string(), limit, now)
        .await
        .map_err(AppError::Quota)
}
