//! Configuration validation.
//!
//! Range checks for values loaded by [`super::Config::from_env`].

use super::Config;
use crate::error::ConfigError;

/// Minimum allowed request timeout in milliseconds (1 second).
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Maximum allowed request timeout in milliseconds (5 minutes).
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Minimum allowed check interval (30 seconds).
pub const MIN_CHECK_INTERVAL_SECS: u64 = 30;

/// Maximum allowed check interval (1 day).
pub const MAX_CHECK_INTERVAL_SECS: u64 = 86_400;

/// Maximum allowed stagger offset per app (10 minutes).
pub const MAX_STAGGER_DELAY_SECS: u64 = 600;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `REASONING_API_KEY` must not be empty
/// - `REQUEST_TIMEOUT_MS` must be between 1000 and 300000
/// - `CHECK_INTERVAL_SECS` must be between 30 and 86400
/// - `STAGGER_DELAY_SECS` must be at most 600
/// - `REASONING_MAX_COMPLETION_TOKENS` must be positive
/// - `CONTAINER_PREFIX` must be a non-empty lowercase name
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api_key.is_empty() {
        return Err(invalid("REASONING_API_KEY", "must not be empty"));
    }

    if config.request_timeout_ms < MIN_TIMEOUT_MS || config.request_timeout_ms > MAX_TIMEOUT_MS {
        return Err(invalid(
            "REQUEST_TIMEOUT_MS",
            &format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms"),
        ));
    }

    if config.check_interval_secs < MIN_CHECK_INTERVAL_SECS
        || config.check_interval_secs > MAX_CHECK_INTERVAL_SECS
    {
        return Err(invalid(
            "CHECK_INTERVAL_SECS",
            &format!("must be between {MIN_CHECK_INTERVAL_SECS} and {MAX_CHECK_INTERVAL_SECS}"),
        ));
    }

    if config.stagger_delay_secs > MAX_STAGGER_DELAY_SECS {
        return Err(invalid(
            "STAGGER_DELAY_SECS",
            &format!("must be at most {MAX_STAGGER_DELAY_SECS}"),
        ));
    }

    if config.max_completion_tokens == 0 {
        return Err(invalid("REASONING_MAX_COMPLETION_TOKENS", "must be positive"));
    }

    // Compose lowercases project names; anything else would break container matching
    let prefix_ok = !config.container_prefix.is_empty()
        && config
            .container_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !prefix_ok {
        return Err(invalid(
            "CONTAINER_PREFIX",
            "must be non-empty and contain only lowercase letters, digits, '-' or '_'",
        ));
    }

    Ok(())
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.into(),
        reason: reason.into(),
    }
}
