use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use trackpool_entitlement::{Engine, EntitlementConfig};
use trackpool_quota::{QuotaOptions, Windows};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub entitlement: EntitlementConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_days")]
    pub expiration_days: u64,
}

fn default_jwt_issuer() -> String {
    "trackpool-identity".to_string()
}

fn default_jwt_audience() -> String {
    "trackpool-web".to_string()
}

fn default_jwt_expiration_days() -> u64 {
    7
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Shared secret for the billing-status webhook delivered by the external
/// payment collaborator.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BillingConfig {
    #[serde(default)]
    pub webhook_secret: String,
}

/// Quota window configuration: the reference timezone, the weekly reset
/// anchor and the tracker's persistence behavior.
#[derive(Debug, Deserialize, Clone)]
pub struct QuotaConfig {
    /// Windows are wall-clock in this timezone, not UTC; billing weeks are
    /// a human concept.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_weekly_weekday")]
    pub weekly_weekday: String,
    #[serde(default)]
    pub weekly_hour: u8,
    #[serde(default = "default_cas_retries")]
    pub cas_retries: u32,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Six-field cron (seconds first) for the proactive sweep.
    #[serde(default = "default_sweep_schedule")]
    pub sweep_schedule: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            weekly_weekday: default_weekly_weekday(),
            weekly_hour: 0,
            cas_retries: default_cas_retries(),
            op_timeout_ms: default_op_timeout_ms(),
            sweep_schedule: default_sweep_schedule(),
        }
    }
}

impl QuotaConfig {
    pub fn windows(&self) -> Result<Windows, trackpool_quota::WindowError> {
        Windows::new(&self.timezone, &self.weekly_weekday, self.weekly_hour)
    }

    pub fn options(&self) -> QuotaOptions {
        QuotaOptions {
            cas_retries: self.cas_retries,
            op_timeout: std::time::Duration::from_millis(self.op_timeout_ms),
        }
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_weekly_weekday() -> String {
    "sunday".to_string()
}

fn default_cas_retries() -> u32 {
    5
}

fn default_op_timeout_ms() -> u64 {
    2000
}

fn default_sweep_schedule() -> String {
    "0 7 * * * *".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TRACKPOOL__DATABASE__URL, etc.)
    /// 2. Config file specified by path
    /// 3. Hardcoded defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite:trackpool.db")?
            .set_default("database.max_connections", 5)?;

        let config_file_path = config_path
            .or_else(|| env::var("CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if std::path::Path::new(&config_file_path).exists() {
            builder = builder.add_source(File::with_name(&config_file_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TRACKPOOL")
                .separator("__")
                .try_parsing(true),
        );

        // Legacy environment variables without the prefix
        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }
        if let Ok(jwt_secret) = env::var("JWT_SECRET") {
            builder = builder.set_override("jwt.secret", jwt_secret)?;
        }
        if let Ok(webhook_secret) = env::var("BILLING_WEBHOOK_SECRET") {
            builder = builder.set_override("billing.webhook_secret", webhook_secret)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration. The entitlement and window sections compile
    /// here so a misconfigured engine refuses to start instead of handing
    /// out wrong tier decisions.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt.secret.len() < 32 {
            return Err("JWT secret must be at least 32 characters long".to_string());
        }
        if self.database.max_connections < 1 {
            return Err("Database max_connections must be at least 1".to_string());
        }
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        Engine::from_config(&self.entitlement).map_err(|err| err.to_string())?;
        self.quota.windows().map_err(|err| err.to_string())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "test_secret_key_minimum_32_characters_long".to_string(),
                issuer: default_jwt_issuer(),
                audience: default_jwt_audience(),
                expiration_days: 7,
            },
            observability: ObservabilityConfig::default(),
            billing: BillingConfig::default(),
            quota: QuotaConfig::default(),
            entitlement: EntitlementConfig::default(),
        }
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validation_short_secret() {
        let mut config = valid_config();
        config.jwt.secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_connections() {
        let mut config = valid_config();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_thresholds() {
        let mut config = valid_config();
        config.entitlement.tiers.standard = config.entitlement.tiers.full;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_timezone() {
        let mut config = valid_config();
        config.quota.timezone = "Atlantis/Capital".to_string();
        assert!(config.validate().is_err());
    }
}
