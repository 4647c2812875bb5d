//! Database migration utilities.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use crate::Config;

/// Run all database migrations, creating the database if needed.
pub async fn migrate(config: &Config) -> anyhow::Result<()> {
    let options =
        SqliteConnectOptions::from_str(&config.database.url)?.create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    pool.close().await;

    tracing::info!("database migrated");

    Ok(())
}

/// Drop the database file if it exists and recreate it with migrations.
pub async fn reset(config: &Config) -> anyhow::Result<()> {
    if let Some(path) = config.database.url.strip_prefix("sqlite:") {
        if Path::new(path).exists() {
            std::fs::remove_file(path)?;
            tracing::info!("dropped database: {}", path);
        }
    }

    migrate(config).await?;

    Ok(())
}
