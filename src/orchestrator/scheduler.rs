//! Periodic per-app scheduling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::Orchestrator;
use crate::config::{DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_STAGGER_DELAY_SECS};

/// Check interval and start stagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between cycle starts for one app.
    pub interval: Duration,
    /// Start delay between consecutive apps.
    pub stagger: Duration,
}

impl Schedule {
    /// Create a schedule.
    #[must_use]
    pub const fn new(interval: Duration, stagger: Duration) -> Self {
        Self { interval, stagger }
    }

    /// Start delay of the app at `index`.
    #[must_use]
    pub fn start_delay(&self, index: usize) -> Duration {
        self.stagger
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            Duration::from_secs(DEFAULT_STAGGER_DELAY_SECS),
        )
    }
}

impl Orchestrator {
    /// Run checks for every app until `shutdown` turns true.
    ///
    /// Apps are enumerated once. Each gets its own task, started
    /// `index × stagger` after the call; cycles of one app never overlap and
    /// ticks missed during a long cycle are skipped. An in-flight cycle is
    /// dropped on shutdown. A dropped shutdown sender also stops the checks.
    pub async fn start_periodic_checks(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let apps = self.apps.get_all().await;
        if apps.is_empty() {
            tracing::warn!(root = %self.apps.root().display(), "No apps to monitor");
        }

        tracing::info!(
            apps = apps.len(),
            interval_secs = self.schedule.interval.as_secs(),
            stagger_secs = self.schedule.stagger.as_secs(),
            "Periodic checks started"
        );

        let mut tasks = JoinSet::new();
        for (index, app) in apps.into_iter().enumerate() {
            let delay = self.schedule.start_delay(index);
            tasks.spawn(Arc::clone(&self).check_loop(app.id, delay, shutdown.clone()));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Check task aborted");
            }
        }

        tracing::info!("Periodic checks stopped");
    }

    async fn check_loop(
        self: Arc<Self>,
        app_id: String,
        delay: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = wait_for_shutdown(&mut shutdown) => return,
        }

        let mut interval = tokio::time::interval(self.schedule.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                () = wait_for_shutdown(&mut shutdown) => break,
            }

            tokio::select! {
                result = self.run_check_for_app(&app_id) => {
                    if let Err(e) = result {
                        tracing::error!(app_id = %app_id, error = %e, "Check cycle failed");
                    }
                }
                () = wait_for_shutdown(&mut shutdown) => {
                    tracing::info!(app_id = %app_id, "Cancelled in-flight check");
                    break;
                }
            }
        }

        tracing::debug!(app_id = %app_id, "Check loop stopped");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        tracing::debug!("Shutdown sender dropped");
    }
}
