//! Host vitals via `sysinfo`.

use async_trait::async_trait;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

use super::types::ServerHealth;
use crate::error::CollectError;
use crate::traits::VitalsProvider;

/// [`VitalsProvider`] reading the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysinfoVitals;

impl SysinfoVitals {
    /// Create a vitals reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VitalsProvider for SysinfoVitals {
    async fn read_vitals(&self) -> Result<ServerHealth, CollectError> {
        tokio::task::spawn_blocking(sample_host)
            .await
            .map_err(|e| CollectError::VitalsUnavailable {
                message: format!("vitals task failed: {e}"),
            })?
    }
}

#[allow(clippy::cast_precision_loss)]
fn sample_host() -> Result<ServerHealth, CollectError> {
    let mut system = System::new();

    // CPU usage is a delta between two refreshes
    system.refresh_cpu_usage();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu_usage();
    let cpu_usage = f64::from(system.global_cpu_usage());

    system.refresh_memory();
    let total_memory = system.total_memory();
    if total_memory == 0 {
        return Err(CollectError::VitalsUnavailable {
            message: "total memory reported as zero".into(),
        });
    }
    let memory_usage = percent(system.used_memory() as f64, total_memory as f64);

    let disks = Disks::new_with_refreshed_list();
    let (total, available) = disks.iter().fold((0u64, 0u64), |(total, available), disk| {
        (
            total.saturating_add(disk.total_space()),
            available.saturating_add(disk.available_space()),
        )
    });
    if total == 0 {
        return Err(CollectError::VitalsUnavailable {
            message: "no disks reported".into(),
        });
    }
    let disk_usage = percent(total.saturating_sub(available) as f64, total as f64);

    Ok(ServerHealth {
        cpu_usage: round2(cpu_usage),
        memory_usage: round2(memory_usage),
        disk_usage: round2(disk_usage),
    })
}

fn percent(used: f64, total: f64) -> f64 {
    (used / total * 100.0).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
