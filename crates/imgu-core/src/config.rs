//! Configuration module
//!
//! Process-level configuration read from the environment. Site-level feature
//! flags (enabled encodings, default groups) live in the settings table and
//! are read through the settings service instead.

use std::env;
use std::time::Duration;

const PORT: u16 = 8080;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const STORAGE_IO_TIMEOUT_SECS: u64 = 30;
const SWEEP_INTERVAL_SECS: u64 = 3600;
const MAX_UPLOAD_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Server and database settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub max_upload_body_bytes: usize,
    pub trusted_proxy_count: usize,
}

/// Storage and background task settings
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub storage_io_timeout_secs: u64,
    pub image_expiry_interval_secs: u64,
    pub session_expiry_interval_secs: u64,
    pub group_reversion_interval_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn max_upload_body_bytes(&self) -> usize {
        self.inner().base.max_upload_body_bytes
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.inner().base.trusted_proxy_count
    }

    /// Upper bound applied to every individual driver call.
    pub fn storage_io_timeout(&self) -> Duration {
        Duration::from_secs(self.inner().storage_io_timeout_secs)
    }

    pub fn image_expiry_interval(&self) -> Duration {
        Duration::from_secs(self.inner().image_expiry_interval_secs)
    }

    pub fn session_expiry_interval(&self) -> Duration {
        Duration::from_secs(self.inner().session_expiry_interval_secs)
    }

    pub fn group_reversion_interval(&self) -> Duration {
        Duration::from_secs(self.inner().group_reversion_interval_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            Err(_) => PORT,
        };

        let base = BaseConfig {
            server_port,
            environment,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            max_upload_body_bytes: env_or("MAX_UPLOAD_BODY_BYTES", MAX_UPLOAD_BODY_BYTES),
            trusted_proxy_count: env_or("TRUSTED_PROXY_COUNT", 0),
        };

        Ok(ServiceConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_io_timeout_secs: env_or("STORAGE_IO_TIMEOUT_SECS", STORAGE_IO_TIMEOUT_SECS),
            image_expiry_interval_secs: env_or("IMAGE_EXPIRY_INTERVAL_SECS", SWEEP_INTERVAL_SECS),
            session_expiry_interval_secs: env_or(
                "SESSION_EXPIRY_INTERVAL_SECS",
                SWEEP_INTERVAL_SECS,
            ),
            group_reversion_interval_secs: env_or(
                "GROUP_REVERSION_INTERVAL_SECS",
                SWEEP_INTERVAL_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.storage_io_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "STORAGE_IO_TIMEOUT_SECS must be greater than zero"
            ));
        }

        for (name, value) in [
            ("IMAGE_EXPIRY_INTERVAL_SECS", self.image_expiry_interval_secs),
            ("SESSION_EXPIRY_INTERVAL_SECS", self.session_expiry_interval_secs),
            ("GROUP_REVERSION_INTERVAL_SECS", self.group_reversion_interval_secs),
        ] {
            if value == 0 {
                return Err(anyhow::anyhow!("{} must be greater than zero", name));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServiceConfig {
        ServiceConfig {
            base: BaseConfig {
                server_port: 8080,
                environment: "development".to_string(),
                db_max_connections: 10,
                db_timeout_seconds: 30,
                max_upload_body_bytes: 1024,
                trusted_proxy_count: 0,
            },
            database_url: "postgres://localhost/imgu".to_string(),
            storage_io_timeout_secs: 30,
            image_expiry_interval_secs: 3600,
            session_expiry_interval_secs: 3600,
            group_reversion_interval_secs: 3600,
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_postgres_url() {
        let mut config = sample();
        config.database_url = "mysql://localhost/imgu".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = sample();
        config.storage_io_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = sample();
        config.session_expiry_interval_secs = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("SESSION_EXPIRY_INTERVAL_SECS"));
    }

    #[test]
    fn test_getters_expose_durations() {
        let config = Config(Box::new(sample()));
        assert_eq!(config.storage_io_timeout(), Duration::from_secs(30));
        assert_eq!(config.image_expiry_interval(), Duration::from_secs(3600));
        assert!(!config.is_production());
    }
}
