//! Admin authorization middleware.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::AppError;
use crate::middleware::auth::CurrentAccount;

/// Verifies the authenticated account has administrator privileges.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, Response> {
    let account = request
        .extensions()
        .get::<CurrentAccount>()
        .cloned()
        .ok_or_else(|| {
            warn!("admin middleware reached without an authenticated account");
            AppError::Unauthorized.into_response()
        })?;

    if !account.0.is_admin {
        warn!(account_id = %account.0.id, "non-admin account attempted an admin route");
        return Err(AppError::AdminRequired.into_response());
    }

    Ok(next.run(request).await)
}
