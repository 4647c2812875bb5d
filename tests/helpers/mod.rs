//! Shared test harness: temp database, migrated schema, router, sessions.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use temp_dir::TempDir;
use tower::ServiceExt;
use trackpool::auth::generate_token;
use trackpool::config::{
    BillingConfig, Config, DatabaseConfig, JwtConfig, ObservabilityConfig, QuotaConfig,
    ServerConfig,
};
use trackpool::quotas::build_quota_service;
use trackpool::routes::{router, AppState};
use trackpool_entitlement::{Engine, EntitlementConfig};

pub const BILLING_SECRET: &str = "test-billing-shared-secret";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub config: Config,
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: "test_secret_key_minimum_32_characters_long".to_string(),
            issuer: "trackpool-identity".to_string(),
            audience: "trackpool-web".to_string(),
            expiration_days: 7,
        },
        observability: ObservabilityConfig::default(),
        billing: BillingConfig {
            webhook_secret: BILLING_SECRET.to_string(),
        },
        quota: QuotaConfig::default(),
        entitlement: EntitlementConfig::default(),
    }
}

pub async fn setup_app(dir: &TempDir) -> anyhow::Result<TestApp> {
    let path = dir.child("trackpool.sqlite3");
    let url = format!("sqlite:{}", path.to_str().unwrap());

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let config = test_config(&url);
    config.validate().map_err(anyhow::Error::msg)?;

    let state = AppState {
        config: config.clone(),
        pool: pool.clone(),
        engine: Arc::new(Engine::from_config(&config.entitlement)?),
        quota: build_quota_service(pool.clone(), &config)?,
    };

    Ok(TestApp {
        router: router(state),
        pool,
        config,
    })
}

pub struct AccountSpec<'a> {
    pub id: &'a str,
    pub stored_value: Option<&'a str>,
    pub vip: bool,
    pub expires_at: Option<i64>,
    pub addons: (bool, bool, bool),
    pub benefit_overrides: Option<&'a str>,
    pub is_admin: bool,
}

impl<'a> AccountSpec<'a> {
    pub fn new(id: &'a str) -> Self {
        Self {
            id,
            stored_value: None,
            vip: false,
            expires_at: None,
            addons: (false, false, false),
            benefit_overrides: None,
            is_admin: false,
        }
    }
}

pub async fn create_account(pool: &SqlitePool, spec: AccountSpec<'_>) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO accounts (id, email, stored_value, vip, expires_at,
             addon_extraction, addon_streaming, addon_uploader,
             benefit_overrides, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )
    .bind(spec.id)
    .bind(format!("{}@trackpool.test", spec.id))
    .bind(spec.stored_value)
    .bind(spec.vip)
    .bind(spec.expires_at)
    .bind(spec.addons.0)
    .bind(spec.addons.1)
    .bind(spec.addons.2)
    .bind(spec.benefit_overrides)
    .bind(spec.is_admin)
    .bind(1_700_000_000_i64)
    .execute(pool)
    .await?;

    Ok(())
}

pub fn session_cookie(config: &Config, account_id: &str) -> String {
    let token = generate_token(
        &config.jwt,
        account_id,
        &format!("{account_id}@trackpool.test"),
        None,
    )
    .expect("token mints");
    format!("session_token={token}")
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}
