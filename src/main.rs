use anyhow::Result;
use clap::{Parser, Subcommand};
use time::OffsetDateTime;

/// trackpool - subscription-gated music distribution
#[derive(Parser)]
#[command(name = "trackpool")]
#[command(about = "Record pool platform: entitlements, quotas and the API around them", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate,
    /// Drop database if exists and recreate with migrations
    Reset,
    /// Reset all quota counters whose window has elapsed, then exit
    Sweep,
    /// Mint a session token for an account (development helper)
    Token {
        #[arg(long)]
        account_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = trackpool::config::Config::load(cli.config.clone())?;
    // Misconfiguration is fatal here, before anything can serve a wrong
    // tier decision.
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    trackpool::observability::init_observability(&config.observability.log_level)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            trackpool::server::serve(config, host, port).await
        }
        Commands::Migrate => trackpool::migrate::migrate(&config).await,
        Commands::Reset => trackpool::migrate::reset(&config).await,
        Commands::Sweep => sweep_command(config).await,
        Commands::Token { account_id } => token_command(config, account_id).await,
    }
}

#[tracing::instrument(skip(config))]
async fn sweep_command(config: trackpool::Config) -> Result<()> {
    let pool =
        trackpool::db::create_pool(&config.database.url, config.database.max_connections).await?;
    let quota = trackpool::quotas::build_quota_service(pool, &config)?;

    let swept = quota.sweep(OffsetDateTime::now_utc()).await?;
    tracing::info!(swept, "quota sweep finished");

    Ok(())
}

async fn token_command(config: trackpool::Config, account_id: String) -> Result<()> {
    let pool =
        trackpool::db::create_pool(&config.database.url, config.database.max_connections).await?;

    let row = trackpool::queries::account::get_account(&pool, &account_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account {account_id} not found"))?;

    let engine = trackpool_entitlement::Engine::from_config(&config.entitlement)?;
    let account = row.into_account();
    let tier = engine.resolve_tier(&account, OffsetDateTime::now_utc());

    let token = trackpool::auth::generate_token(
        &config.jwt,
        &account.id,
        &account.email,
        Some(tier.to_string()),
    )?;
    println!("{token}");

    Ok(())
}
