use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::auth::{validate_token, SESSION_COOKIE_NAME};
use crate::error::AppError;
use crate::routes::AppState;

/// The authenticated account, loaded fresh from persistence for this
/// request. Session claims are only a hint; this is the authoritative
/// snapshot every downstream check uses.
#[derive(Clone, Debug)]
pub struct CurrentAccount(pub trackpool_entitlement::Account);

/// Authentication middleware: validates the session cookie, reloads the
/// account from the database, and attaches it to the request.
///
/// Rejects when the token is missing, invalid, or refers to an account
/// that no longer exists.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
        tracing::debug!("missing session cookie");
        return AppError::Unauthorized.into_response();
    };

    let claims = match validate_token(cookie.value(), &state.config.jwt) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(error = %err, "invalid session token");
            return AppError::Unauthorized.into_response();
        }
    };

    let row = match crate::queries::account::get_account(&state.pool, &claims.sub).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            tracing::warn!(account_id = %claims.sub, "session for unknown account");
            return AppError::Unauthorized.into_response();
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to load account for session");
            return AppError::Unauthorized.into_response();
        }
    };

    if let Some(hint) = &claims.tier {
        // Stale claims are expected after administrative changes; worth a
        // trace, never worth trusting.
        tracing::trace!(account_id = %claims.sub, tier_hint = %hint, "session carries tier hint");
    }

    req.extensions_mut()
        .insert(CurrentAccount(row.into_account()));
    next.run(req).await
}
