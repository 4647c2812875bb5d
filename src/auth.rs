//! Session token handling.
//!
//! Identity is delegated to an external provider; this module only
//! validates the session cookie it issues and exposes the claims. The
//! claims are a hint: tier-relevant fields may be stale relative to
//! administrative changes, so gating always recomputes from persisted
//! account state.

use std::time::{SystemTime, UNIX_EPOCH};

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;

pub const SESSION_COOKIE_NAME: &str = "session_token";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
    pub iss: String,
    /// Account id.
    pub sub: String,
    pub email: String,
    /// Tier hint as known at token issuance. Display only, never trusted
    /// for gating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

pub fn generate_token(
    config: &JwtConfig,
    sub: &str,
    email: &str,
    tier: Option<String>,
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let claims = Claims {
        aud: config.audience.clone(),
        exp: now + config.expiration_days * 24 * 60 * 60,
        iat: now,
        iss: config.issuer.clone(),
        sub: sub.to_string(),
        email: email.to_string(),
        tier,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn validate_token(token: &str, config: &JwtConfig) -> anyhow::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer.clone()]);
    validation.set_audience(&[config.audience.clone()]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

pub fn build_cookie<'a>(
    config: &JwtConfig,
    sub: &str,
    email: &str,
    tier: Option<String>,
) -> anyhow::Result<Cookie<'a>> {
    let token = generate_token(config, sub, email, tier)?;

    Ok(Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build())
}
