//! Process configuration.
//!
//! This module handles:
//! - Environment variable loading (with `.env` support)
//! - Configuration validation
//! - Default value handling
//! - Secure API key storage via [`SecretString`]
//!
//! Per-app declarative configs live in [`crate::apps`]; this is the
//! configuration of the orchestrator process itself.

mod secret;
mod validation;

pub use secret::SecretString;
pub use validation::{
    validate_config, MAX_CHECK_INTERVAL_SECS, MAX_STAGGER_DELAY_SECS, MAX_TIMEOUT_MS,
    MIN_CHECK_INTERVAL_SECS, MIN_TIMEOUT_MS,
};

use crate::error::ConfigError;

/// Default reasoning API base URL.
pub const DEFAULT_REASONING_BASE_URL: &str = "https://api.openai.com/v1";

/// Default reasoning model.
pub const DEFAULT_REASONING_MODEL: &str = "gpt-4o-mini";

/// Default completion token budget.
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 4000;

/// Default reasoning request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 60_000;

/// Default database path.
pub const DEFAULT_DATABASE_PATH: &str = "./data/appstore.db";

/// Default root directory holding one subdirectory per app.
pub const DEFAULT_APPS_ROOT: &str = "./apps";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default interval between checks of one app (5 minutes).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// Default per-app start offset used to stagger the first checks.
pub const DEFAULT_STAGGER_DELAY_SECS: u64 = 10;

/// Default container name prefix.
pub const DEFAULT_CONTAINER_PREFIX: &str = "appstore";

/// Default container runtime binary.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Orchestrator configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
/// The `api_key` field uses [`SecretString`] to prevent accidental logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Reasoning API bearer token.
    pub api_key: SecretString,
    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    pub reasoning_base_url: String,
    /// Model name sent with every completion request.
    pub reasoning_model: String,
    /// `max_completion_tokens` sent with every completion request.
    pub max_completion_tokens: u32,
    /// Reasoning and uptime request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Audit database path.
    pub database_path: String,
    /// Root directory of per-app configs.
    pub apps_root: String,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Seconds between two checks of the same app.
    pub check_interval_secs: u64,
    /// Start offset per app index, in seconds.
    pub stagger_delay_secs: u64,
    /// Base URL of the uptime monitor status API, if any.
    pub uptime_monitor_url: Option<String>,
    /// Prefix of every managed container and compose project.
    pub container_prefix: String,
    /// Path or name of the `docker` binary.
    pub docker_binary: String,
    /// Image families whose versions are resolved from runtime labels at bootstrap.
    pub pinned_image_families: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `REASONING_API_KEY`: bearer token for the reasoning API
    ///
    /// Optional environment variables (with defaults):
    /// - `REASONING_BASE_URL` (`https://api.openai.com/v1`)
    /// - `REASONING_MODEL` (`gpt-4o-mini`)
    /// - `REASONING_MAX_COMPLETION_TOKENS` (`4000`)
    /// - `REQUEST_TIMEOUT_MS` (`60000`)
    /// - `DATABASE_PATH` (`./data/appstore.db`)
    /// - `APPS_ROOT` (`./apps`)
    /// - `LOG_LEVEL` (`info`)
    /// - `CHECK_INTERVAL_SECS` (`300`)
    /// - `STAGGER_DELAY_SECS` (`10`)
    /// - `UPTIME_MONITOR_URL` (unset)
    /// - `CONTAINER_PREFIX` (`appstore`)
    /// - `DOCKER_BINARY` (`docker`)
    /// - `PINNED_IMAGE_FAMILIES` (empty, comma-separated)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `REASONING_API_KEY` is missing, a numeric
    /// variable does not parse, or any value fails [`validate_config`].
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let api_key =
            std::env::var("REASONING_API_KEY").map_err(|_| ConfigError::MissingRequired {
                var: "REASONING_API_KEY".into(),
            })?;

        let uptime_monitor_url = std::env::var("UPTIME_MONITOR_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let pinned_image_families = std::env::var("PINNED_IMAGE_FAMILIES")
            .map(|value| parse_list(&value))
            .unwrap_or_default();

        let config = Self {
            api_key: SecretString::new(api_key),
            reasoning_base_url: env_or("REASONING_BASE_URL", DEFAULT_REASONING_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            reasoning_model: env_or("REASONING_MODEL", DEFAULT_REASONING_MODEL),
            max_completion_tokens: parse_env_u32(
                "REASONING_MAX_COMPLETION_TOKENS",
                DEFAULT_MAX_COMPLETION_TOKENS,
            )?,
            request_timeout_ms: parse_env_u64("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            database_path: env_or("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            apps_root: env_or("APPS_ROOT", DEFAULT_APPS_ROOT),
            log_level: env_or("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            check_interval_secs: parse_env_u64("CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL_SECS)?,
            stagger_delay_secs: parse_env_u64("STAGGER_DELAY_SECS", DEFAULT_STAGGER_DELAY_SECS)?,
            uptime_monitor_url,
            container_prefix: env_or("CONTAINER_PREFIX", DEFAULT_CONTAINER_PREFIX),
            docker_binary: env_or("DOCKER_BINARY", DEFAULT_DOCKER_BINARY),
            pinned_image_families,
        };

        validate_config(&config)?;
        Ok(config)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse an environment variable as u64, using a default if not set.
fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as u32, using a default if not set.
fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}
