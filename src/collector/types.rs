//! Snapshot types.
//!
//! The serialized form of [`SystemSnapshot`] is exactly what the reasoning
//! service sees, so field names here are part of the prompt contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Host resource usage, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ServerHealth {
    /// CPU usage across all cores.
    pub cpu_usage: f64,
    /// Used memory over total memory.
    pub memory_usage: f64,
    /// Used space over total space across all disks.
    pub disk_usage: f64,
}

/// Observed state of one expected service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Container is up.
    Running,
    /// Container is stopped, crashed or missing.
    Exited,
    /// Runtime is restarting the container.
    Restarting,
}

impl ServiceState {
    /// Lowercase name as it appears in snapshots and messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Restarting => "restarting",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword scan of a service's recent logs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogSummary {
    /// Number of lines containing at least one error keyword.
    pub errors_found: u32,
    /// Up to five matching lines, each at most 200 characters.
    pub sample_error_lines: Vec<String>,
}

/// Observed state of one expected service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Logical service name from the app config.
    pub name: String,
    /// Mapped runtime state.
    pub status: ServiceState,
    /// Restarts performed by the runtime.
    pub restart_count: u32,
    /// Canonical container name; the only valid restart target.
    pub container_name: String,
    /// False if the runtime has no container with `container_name`.
    pub container_exists: bool,
    /// Recent log findings.
    pub log_summary: LogSummary,
}

impl ServiceStatus {
    /// Status of a service with no matching container.
    #[must_use]
    pub fn missing(name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ServiceState::Exited,
            restart_count: 0,
            container_name: container_name.into(),
            container_exists: false,
            log_summary: LogSummary::default(),
        }
    }
}

/// Uptime monitor verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UptimeStatus {
    /// Reachable, or no monitor configured.
    Up,
    /// Monitor reports down or could not be queried.
    Down,
}

/// What the app config declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Logical service names, in declaration order.
    pub expected_services: Vec<String>,
}

/// What the runtime reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualState {
    /// One entry per expected service, same order.
    pub services: Vec<ServiceStatus>,
    /// Uptime monitor verdict.
    pub uptime_status: UptimeStatus,
}

/// Desired versus actual state of one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    /// Identifier to echo back in persisted messages.
    pub app_id: String,
    /// Display name.
    pub app_name: String,
    /// Declared state.
    pub desired_state: DesiredState,
    /// Observed state.
    pub actual_state: ActualState,
}

/// Point-in-time capture handed to the reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Host vitals.
    pub server_health: ServerHealth,
    /// Apps covered by this snapshot.
    pub apps: Vec<AppStatus>,
}

impl SystemSnapshot {
    /// Canonical container names of `app_id`'s expected services.
    #[must_use]
    pub fn container_names(&self, app_id: &str) -> Vec<&str> {
        self.apps
            .iter()
            .filter(|app| app.app_id == app_id)
            .flat_map(|app| &app.actual_state.services)
            .map(|service| service.container_name.as_str())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_service_is_exited_with_zero_restarts() {
        let status = ServiceStatus::missing("db", "appstore-nextcloud-db-1");
        assert_eq!(status.status, ServiceState::Exited);
        assert_eq!(status.restart_count, 0);
        assert!(!status.container_exists);
        assert_eq!(status.log_summary, LogSummary::default());
    }

    #[test]
    fn test_container_names_are_scoped_to_app() {
        let app = |id: &str| AppStatus {
            app_id: id.into(),
            app_name: id.into(),
            desired_state: DesiredState {
                expected_services: vec!["app".into()],
            },
            actual_state: ActualState {
                services: vec![ServiceStatus::missing("app", format!("appstore-{id}-app-1"))],
                uptime_status: UptimeStatus::Up,
            },
        };
        let snapshot = SystemSnapshot {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            server_health: ServerHealth {
                cpu_usage: 1.0,
                memory_usage: 2.0,
                disk_usage: 3.0,
            },
            apps: vec![app("nextcloud"), app("gitea")],
        };

        assert_eq!(snapshot.container_names("gitea"), vec!["appstore-gitea-app-1"]);
        assert!(snapshot.container_names("jellyfin").is_empty());
    }

    #[test]
    fn test_wire_names() {
        let app = AppStatus {
            app_id: "nextcloud".into(),
            app_name: "Nextcloud".into(),
            desired_state: DesiredState {
                expected_services: vec!["db".into()],
            },
            actual_state: ActualState {
                services: vec![ServiceStatus::missing("db", "appstore-nextcloud-db-1")],
                uptime_status: UptimeStatus::Up,
            },
        };

        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["actual_state"]["uptime_status"], "UP");
        assert_eq!(json["actual_state"]["services"][0]["status"], "exited");
        assert_eq!(
            json["actual_state"]["services"][0]["container_name"],
            "appstore-nextcloud-db-1"
        );
        assert_eq!(json["desired_state"]["expected_services"][0], "db");
    }
}
