//! Test utilities and fixtures.
//!
//! This module provides shared testing infrastructure:
//! - Fixed clocks and timestamps
//! - App config and snapshot factories
//! - Preconfigured collaborator mocks
//!
//! Only compiled for tests (`#[cfg(test)]`).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::apps::AppConfig;
use crate::collector::{
    ActualState, AppStatus, DesiredState, ServerHealth, ServiceStatus, SystemSnapshot,
    UptimeStatus,
};
use crate::traits::{MockTimeProvider, MockVitalsProvider, TimeProvider};

/// The instant every fixture clock reports: 2024-06-01T12:00:00Z.
#[must_use]
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// A clock frozen at [`fixed_time`].
#[must_use]
pub fn fixed_clock() -> Arc<dyn TimeProvider> {
    let mut clock = MockTimeProvider::new();
    clock.expect_now().return_const(fixed_time());
    Arc::new(clock)
}

/// A vitals provider reporting a lightly loaded host, any number of times.
#[must_use]
pub fn healthy_vitals() -> MockVitalsProvider {
    let mut vitals = MockVitalsProvider::new();
    vitals.expect_read_vitals().returning(|| {
        Ok(ServerHealth {
            cpu_usage: 12.5,
            memory_usage: 40.0,
            disk_usage: 55.0,
        })
    });
    vitals
}

/// An app config with the given services; the first one is primary.
///
/// The config is not backed by a directory.
#[must_use]
pub fn app_config(id: &str, services: &[&str]) -> AppConfig {
    AppConfig {
        id: id.to_string(),
        name: id.to_string(),
        primary_service: services.first().map(ToString::to_string).unwrap_or_default(),
        uptime_monitor_ref: None,
        expected_services: services.iter().map(ToString::to_string).collect(),
        needs_bootstrap: false,
        dir: PathBuf::new(),
    }
}

/// A snapshot at [`fixed_time`] holding one app with `services`.
#[must_use]
pub fn snapshot_with(app_id: &str, services: Vec<ServiceStatus>) -> SystemSnapshot {
    SystemSnapshot {
        timestamp: fixed_time(),
        server_health: ServerHealth {
            cpu_usage: 12.5,
            memory_usage: 40.0,
            disk_usage: 55.0,
        },
        apps: vec![AppStatus {
            app_id: app_id.to_string(),
            app_name: app_id.to_string(),
            desired_state: DesiredState {
                expected_services: services.iter().map(|s| s.name.clone()).collect(),
            },
            actual_state: ActualState {
                services,
                uptime_status: UptimeStatus::Up,
            },
        }],
    }
}
