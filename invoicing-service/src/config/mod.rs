//! Configuration module for invoicing-service.

use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageBackend,
    /// Present when `storage` is Postgres.
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown STORAGE_BACKEND '{}', expected 'postgres' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Switches for the plan-based request limits and the usage log.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub rate_limit_enabled: bool,
    pub usage_tracking_enabled: bool,
    pub plan_quotas_enabled: bool,
    pub trial_days: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_enabled: true,
            usage_tracking_enabled: true,
            plan_quotas_enabled: false,
            trial_days: 14,
        }
    }
}

impl InvoicingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let storage = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::Postgres,
        };

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            }),
            StorageBackend::Memory => None,
        };

        let defaults = LimitsConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "invoicing-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            storage,
            database,
            cors: CorsConfig {
                allowed_origins: parse_origins(
                    &env::var("CORS_ALLOWED_ORIGINS")
                        .unwrap_or_else(|_| "http://localhost:5173".to_string()),
                ),
            },
            limits: LimitsConfig {
                rate_limit_enabled: env_flag("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
                usage_tracking_enabled: env_flag(
                    "USAGE_TRACKING_ENABLED",
                    defaults.usage_tracking_enabled,
                ),
                plan_quotas_enabled: env_flag("PLAN_QUOTAS_ENABLED", defaults.plan_quotas_enabled),
                trial_days: env::var("TRIAL_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|days: &i64| *days >= 0)
                    .unwrap_or(defaults.trial_days),
            },
        })
    }

    /// In-memory configuration on an ephemeral port, used by the test harness.
    pub fn for_memory() -> Self {
        Self {
            common: core_config::Config {
                port: 0,
                ..core_config::Config::default()
            },
            service_name: "invoicing-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            storage: StorageBackend::Memory,
            database: None,
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            limits: LimitsConfig::default(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
