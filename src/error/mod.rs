//! Error types for the app store orchestrator.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level errors returned by an orchestration cycle
//! - [`ReasoningError`]: Reasoning API and response-contract errors
//! - [`RuntimeError`]: Container runtime errors
//! - [`StorageError`]: Audit store errors
//! - [`AppConfigError`]: Per-app declarative config errors
//! - [`CollectError`]: Snapshot collection errors
//! - [`SetupError`]: Bootstrap errors
//! - [`ConfigError`]: Process configuration errors
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
///
/// Wraps every subsystem error so a cycle can report a single type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Reasoning API error.
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    /// Container runtime error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// App config error.
    #[error("App config error: {0}")]
    AppConfig(#[from] AppConfigError),

    /// Snapshot collection error.
    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    /// Bootstrap error.
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One or more remediation actions failed; carries the last failure.
    #[error("Action failed: {message}")]
    Action {
        /// Description of the last failed action.
        message: String,
    },
}

/// Reasoning service errors.
///
/// Any of these sends the orchestrator down the fallback path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReasoningError {
    /// Authentication failed due to an invalid API key.
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Request was rate limited.
    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds the API asked us to wait.
        retry_after_seconds: u64,
    },

    /// Request timed out.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Network communication error.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// Unexpected HTTP status or envelope from the API.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what was unexpected.
        message: String,
    },

    /// The completion text could not be decoded as JSON.
    #[error("Invalid JSON in response: {message}")]
    InvalidJson {
        /// Decoder message.
        message: String,
    },

    /// The decoded response violates the output schema.
    #[error("Response validation failed for {field}: {reason}")]
    Validation {
        /// Offending field path.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Container runtime errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The runtime binary could not be spawned.
    #[error("Failed to run {command}: {message}")]
    Spawn {
        /// Command line that was attempted.
        command: String,
        /// OS error text.
        message: String,
    },

    /// The runtime command exited unsuccessfully.
    #[error("{command} failed: {message}")]
    CommandFailed {
        /// Command line that failed.
        command: String,
        /// Captured stderr.
        message: String,
    },

    /// The runtime command exceeded its time bound.
    #[error("{command} timed out after {timeout_ms}ms")]
    Timeout {
        /// Command line that timed out.
        command: String,
        /// Bound in milliseconds.
        timeout_ms: u64,
    },

    /// Runtime output could not be parsed.
    #[error("Failed to parse runtime output: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },
}

impl RuntimeError {
    /// Returns true if the failure was caused by a host port already in use.
    #[must_use]
    pub fn is_port_conflict(&self) -> bool {
        let message = match self {
            Self::CommandFailed { message, .. } | Self::Spawn { message, .. } => message,
            Self::Timeout { .. } | Self::Parse { .. } => return false,
        };
        let lower = message.to_lowercase();
        lower.contains("port is already allocated")
            || lower.contains("address already in use")
            || lower.contains("port conflict")
    }
}

/// Storage errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Failed to connect to the database.
    #[error("Database connection failed: {message}")]
    ConnectionFailed {
        /// Description of the connection failure.
        message: String,
    },

    /// A database query failed.
    #[error("Query failed: {query} - {message}")]
    QueryFailed {
        /// The query that failed.
        query: String,
        /// Description of the failure.
        message: String,
    },

    /// Database migration failed.
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed {
        /// The migration version that failed.
        version: String,
        /// Description of the failure.
        message: String,
    },

    /// Internal storage error.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// Errors loading a per-app declarative config.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppConfigError {
    /// No app with this id exists under the config root.
    #[error("App not found: {app_id}")]
    NotFound {
        /// The requested app id.
        app_id: String,
    },

    /// The file or directory could not be read or written.
    #[error("I/O error at {path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// OS error text.
        message: String,
    },

    /// The file is not valid YAML for an app config.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Path of the file.
        path: String,
        /// Decoder message.
        message: String,
    },

    /// A required field is absent or empty.
    #[error("Missing required field {field} in {path}")]
    MissingField {
        /// Path of the file.
        path: String,
        /// Field name.
        field: String,
    },

    /// A field is present but holds an unusable value.
    #[error("Invalid field {field} in {path}: {message}")]
    InvalidField {
        /// Path of the file.
        path: String,
        /// Field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The bootstrap flag is still set after the file was rewritten.
    #[error("Bootstrap flag still set in {path} after rewrite")]
    FlagNotCleared {
        /// Path of the file.
        path: String,
    },
}

/// Snapshot collection errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectError {
    /// Host vitals could not be read; the only fatal collection path.
    #[error("Server vitals unavailable: {message}")]
    VitalsUnavailable {
        /// Description of the failure.
        message: String,
    },
}

/// Bootstrap errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A bootstrap step failed; later steps were not attempted.
    #[error("Setup step {step} failed: {message}")]
    StepFailed {
        /// One-based step index.
        step: u8,
        /// Description of the failure.
        message: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}
