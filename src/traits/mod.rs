//! Trait definitions for mockable dependencies.
//!
//! This module defines traits for:
//! - [`ContainerRuntime`]: Container runtime abstraction
//! - [`AuditStore`]: Audit message persistence abstraction
//! - [`ChatClient`]: Reasoning API client abstraction
//! - [`HealthAnalyzer`]: Snapshot analysis abstraction used by the orchestrator
//! - [`VitalsProvider`]: Host vitals abstraction
//! - [`TimeProvider`]: Time abstraction for testing
//!
//! # Mocking
//!
//! All traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for testing.
//!
//! # Example
//!
//! ```
//! use appstore_orchestrator::traits::{TimeProvider, RealTimeProvider};
//!
//! let time_provider = RealTimeProvider;
//! let now = time_provider.now();
//! println!("Current time: {now}");
//! ```

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::collector::{ServerHealth, SystemSnapshot};
use crate::error::{CollectError, ReasoningError, RuntimeError, StorageError};
use crate::reasoning::LlmResponse;
use crate::runtime::ContainerSummary;
use crate::storage::{NewMessage, StoredMessage};

/// Container runtime trait for mocking.
///
/// One instance is owned by the orchestrator and shared with every
/// component that talks to the runtime, so implementations must be safe
/// for concurrent use.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all containers, running and stopped.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the runtime cannot be queried.
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Number of times the runtime has restarted `container_name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the container cannot be inspected.
    async fn restart_count(&self, container_name: &str) -> Result<u32, RuntimeError>;

    /// Combined stdout and stderr of `container_name` since `since`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the logs cannot be fetched.
    async fn logs_since(
        &self,
        container_name: &str,
        since: DateTime<Utc>,
    ) -> Result<String, RuntimeError>;

    /// Restart `container_name`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeout`] if the bound is exceeded, or another
    /// [`RuntimeError`] carrying the runtime's message.
    async fn restart(&self, container_name: &str, timeout: Duration) -> Result<(), RuntimeError>;

    /// Pull `image_ref` and read its `org.opencontainers.image.version` label.
    ///
    /// Returns `None` if the image carries no such label.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the pull or inspection fails.
    async fn image_version_label(&self, image_ref: &str) -> Result<Option<String>, RuntimeError>;

    /// Pull every image of a compose project.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the pull fails.
    async fn compose_pull(&self, compose_file: &Path, project: &str) -> Result<(), RuntimeError>;

    /// Create and start every container of a compose project in the background.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if the project cannot be started.
    async fn compose_up(&self, compose_file: &Path, project: &str) -> Result<(), RuntimeError>;
}

/// Audit store trait for mocking.
///
/// The store is append-only: messages are never updated or deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one message.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database operation fails.
    async fn create_message(&self, message: NewMessage) -> Result<StoredMessage, StorageError>;

    /// Messages for `app_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the database operation fails.
    async fn get_messages(
        &self,
        app_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredMessage>, StorageError>;
}

/// Chat-completion client trait for mocking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send `prompt` as the single user message and return the first choice's text.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError`] on transport, HTTP status or envelope failures.
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError>;
}

/// Snapshot analysis trait.
///
/// The orchestrator only sees this seam; any error sends it down the
/// fallback path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthAnalyzer: Send + Sync {
    /// Produce a validated diagnosis for `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`ReasoningError`] if the call, parse or validation fails.
    async fn analyze(&self, snapshot: &SystemSnapshot) -> Result<LlmResponse, ReasoningError>;
}

/// Host vitals trait for mocking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VitalsProvider: Send + Sync {
    /// Read CPU, memory and disk usage.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::VitalsUnavailable`] if the host cannot be read.
    async fn read_vitals(&self) -> Result<ServerHealth, CollectError>;
}

/// Time provider trait for deterministic testing.
///
/// This trait abstracts time operations to allow for
/// deterministic testing by providing fixed timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait TimeProvider: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time provider using system clock.
///
/// This is the production implementation that returns the actual current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
