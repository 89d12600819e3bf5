//! Snapshot collection.
//!
//! [`Collector::collect_snapshot`] builds the point-in-time view of one app
//! that the reasoning service analyzes:
//! 1. Host vitals (the only fatal step)
//! 2. One container listing
//! 3. Per expected service: state, restart count and a log keyword scan
//! 4. Uptime monitor status
//!
//! Everything after step 1 degrades to defaults with a warning.

mod logs;
mod types;
mod uptime;
mod vitals;

pub use logs::{scan_logs, ERROR_KEYWORDS, MAX_LINE_CHARS, MAX_SAMPLE_LINES};
pub use types::{
    ActualState, AppStatus, DesiredState, LogSummary, ServerHealth, ServiceState, ServiceStatus,
    SystemSnapshot, UptimeStatus,
};
pub use uptime::UptimeMonitor;
pub use vitals::SysinfoVitals;

use std::sync::Arc;

use chrono::Duration;

use crate::apps::AppConfig;
use crate::error::CollectError;
use crate::runtime::{ContainerState, ContainerSummary};
use crate::traits::{ContainerRuntime, TimeProvider, VitalsProvider};

/// How far back container logs are scanned.
pub const LOG_WINDOW_MINUTES: i64 = 5;

/// Builds [`SystemSnapshot`]s for single apps.
pub struct Collector {
    runtime: Arc<dyn ContainerRuntime>,
    vitals: Arc<dyn VitalsProvider>,
    uptime: UptimeMonitor,
    clock: Arc<dyn TimeProvider>,
    container_prefix: String,
}

impl Collector {
    /// Create a collector sharing the orchestrator's runtime client.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        vitals: Arc<dyn VitalsProvider>,
        uptime: UptimeMonitor,
        clock: Arc<dyn TimeProvider>,
        container_prefix: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            vitals,
            uptime,
            clock,
            container_prefix: container_prefix.into(),
        }
    }

    /// Capture vitals plus the desired and actual state of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::VitalsUnavailable`] if host vitals cannot be read.
    pub async fn collect_snapshot(&self, config: &AppConfig) -> Result<SystemSnapshot, CollectError> {
        let server_health = self.vitals.read_vitals().await?;
        let timestamp = self.clock.now();

        let containers = match self.runtime.list_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                tracing::warn!(app_id = %config.id, error = %e, "Container listing failed, treating as empty");
                Vec::new()
            }
        };

        let mut services = Vec::with_capacity(config.expected_services.len());
        for service in &config.expected_services {
            services.push(self.service_status(config, service, &containers, timestamp).await);
        }

        let uptime_status = self
            .uptime
            .status(config.uptime_monitor_ref.as_deref())
            .await;

        let app = AppStatus {
            app_id: config.id.clone(),
            app_name: config.name.clone(),
            desired_state: DesiredState {
                expected_services: config.expected_services.clone(),
            },
            actual_state: ActualState {
                services,
                uptime_status,
            },
        };

        tracing::debug!(
            app_id = %config.id,
            services = app.actual_state.services.len(),
            uptime = ?uptime_status,
            "Snapshot collected"
        );

        Ok(SystemSnapshot {
            timestamp,
            server_health,
            apps: vec![app],
        })
    }

    async fn service_status(
        &self,
        config: &AppConfig,
        service: &str,
        containers: &[ContainerSummary],
        now: chrono::DateTime<chrono::Utc>,
    ) -> ServiceStatus {
        let container_name = config.container_name(&self.container_prefix, service);

        let Some(container) = containers.iter().find(|c| c.name == container_name) else {
            return ServiceStatus::missing(service, container_name);
        };

        let status = match container.state {
            ContainerState::Running => ServiceState::Running,
            ContainerState::Restarting => ServiceState::Restarting,
            _ => ServiceState::Exited,
        };

        let restart_count = match self.runtime.restart_count(&container_name).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(container = %container_name, error = %e, "Restart count unavailable");
                0
            }
        };

        let log_summary = if status == ServiceState::Running {
            let since = now - Duration::minutes(LOG_WINDOW_MINUTES);
            match self.runtime.logs_since(&container_name, since).await {
                Ok(logs) => scan_logs(&logs),
                Err(e) => {
                    tracing::warn!(container = %container_name, error = %e, "Log fetch failed");
                    LogSummary::default()
                }
            }
        } else {
            LogSummary::default()
        };

        ServiceStatus {
            name: service.to_string(),
            status,
            restart_count,
            container_name,
            container_exists: true,
            log_summary,
        }
    }
}
