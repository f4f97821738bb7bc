//! Configuration module
//!
//! Environment-driven settings for the database pool, upload storage and the
//! signer summary page.

use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const MIN_REJECTION_REASON_LEN: usize = 20;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_TIMEZONE: &str = "America/Bogota";

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Workflow service configuration
#[derive(Clone, Debug)]
pub struct SignflowConfig {
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Directory that stored paths (`uploads/...`) are resolved against
    pub upload_dir: String,
    pub max_upload_size_bytes: usize,
    /// Enforced by the service layer above the engine, never by the engine itself
    pub min_rejection_reason_len: usize,
    pub signer_page_timezone: String,
    pub log_format: LogFormat,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<SignflowConfig>);

impl Config {
    fn inner(&self) -> &SignflowConfig {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = SignflowConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn upload_dir(&self) -> &str {
        &self.inner().upload_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn min_rejection_reason_len(&self) -> usize {
        self.inner().min_rejection_reason_len
    }

    pub fn log_format(&self) -> LogFormat {
        self.inner().log_format
    }

    /// Timezone used to render timestamps on the signer page.
    /// Falls back to UTC when the configured name does not parse.
    pub fn signer_page_timezone(&self) -> Tz {
        self.inner()
            .signer_page_timezone
            .parse::<Tz>()
            .unwrap_or(Tz::UTC)
    }
}

impl SignflowConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        Ok(SignflowConfig {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            min_rejection_reason_len: env::var("MIN_REJECTION_REASON_LEN")
                .unwrap_or_else(|_| MIN_REJECTION_REASON_LEN.to_string())
                .parse()
                .unwrap_or(MIN_REJECTION_REASON_LEN),
            signer_page_timezone: env::var("SIGNER_PAGE_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
            log_format: env::var("LOG_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(LogFormat::Pretty),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.signer_page_timezone.parse::<Tz>().is_err() {
            return Err(anyhow::anyhow!(
                "SIGNER_PAGE_TIMEZONE '{}' is not a known IANA timezone",
                self.signer_page_timezone
            ));
        }

        Ok(())
    }
}
