//! Per-app check, analyze and act cycle.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │                                                              │
//! │  run_check_for_app(app_id)                                   │
//! │    AppConfigProvider ──► needs_bootstrap? ──► SetupHandler   │
//! │           │                                   (audit events) │
//! │           ▼                                                  │
//! │       Collector ──► HealthAnalyzer ──err──► fallback         │
//! │                          │                     │             │
//! │                          ▼                     ▼             │
//! │                    ActionExecutor (runtime, audit store)     │
//! │                                                              │
//! │  start_periodic_checks(shutdown)                             │
//! │    one staggered task per app, fixed interval                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod actions;
mod fallback;
mod scheduler;

pub use actions::{
    map_status_level, ActionExecutor, ActionOutcome, AnalysisSource, RESTART_TIMEOUT,
};
pub use fallback::{fallback_analysis, RESTART_COUNT_THRESHOLD};
pub use scheduler::Schedule;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use crate::apps::{AppConfig, AppConfigProvider};
use crate::bootstrap::{
    InitialSetupHandler, ResolverRegistry, SetupProgress, TOTAL_STEPS,
};
use crate::collector::{Collector, SysinfoVitals, UptimeMonitor};
use crate::config::Config;
use crate::error::AppError;
use crate::reasoning::{ClientConfig, OpenAiClient, ReasoningService};
use crate::runtime::DockerCli;
use crate::storage::{NewMessage, SenderType, SqliteStorage, StatusLevel};
use crate::traits::{AuditStore, ContainerRuntime, HealthAnalyzer, RealTimeProvider, TimeProvider};

/// Coordinates collection, analysis and remediation for every app.
pub struct Orchestrator {
    apps: AppConfigProvider,
    collector: Collector,
    analyzer: Arc<dyn HealthAnalyzer>,
    runtime: Arc<dyn ContainerRuntime>,
    audit: Arc<dyn AuditStore>,
    setup: InitialSetupHandler,
    clock: Arc<dyn TimeProvider>,
    schedule: Schedule,
}

impl Orchestrator {
    /// Assemble an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        apps: AppConfigProvider,
        collector: Collector,
        analyzer: Arc<dyn HealthAnalyzer>,
        runtime: Arc<dyn ContainerRuntime>,
        audit: Arc<dyn AuditStore>,
        setup: InitialSetupHandler,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            apps,
            collector,
            analyzer,
            runtime,
            audit,
            setup,
            clock,
            schedule: Schedule::default(),
        }
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit database cannot be opened or the
    /// reasoning client cannot be built.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let storage = SqliteStorage::new(&config.database_path).await?;
        let audit: Arc<dyn AuditStore> = Arc::new(storage);

        let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new(&config.docker_binary));
        let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
        let apps = AppConfigProvider::new(&config.apps_root);

        let uptime = UptimeMonitor::new(
            config.uptime_monitor_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        );
        let collector = Collector::new(
            Arc::clone(&runtime),
            Arc::new(SysinfoVitals),
            uptime,
            Arc::clone(&clock),
            &config.container_prefix,
        );

        let client = OpenAiClient::new(config.api_key.clone(), ClientConfig::from_config(config))?;
        let analyzer: Arc<dyn HealthAnalyzer> = Arc::new(ReasoningService::new(Arc::new(client)));

        let resolvers =
            ResolverRegistry::with_label_families(&config.pinned_image_families, &runtime);
        let setup = InitialSetupHandler::new(
            Arc::clone(&runtime),
            apps.clone(),
            resolvers,
            &config.container_prefix,
        );

        tracing::info!(
            apps_root = %config.apps_root,
            database = %config.database_path,
            pinned_families = config.pinned_image_families.len(),
            "Orchestrator initialized"
        );

        Ok(Self::new(apps, collector, analyzer, runtime, audit, setup, clock).with_schedule(
            Schedule::new(
                Duration::from_secs(config.check_interval_secs),
                Duration::from_secs(config.stagger_delay_secs),
            ),
        ))
    }

    /// Replace the periodic schedule.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Run one cycle for `app_id`.
    ///
    /// Apps flagged for bootstrap run setup instead of a health check.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded, vitals are
    /// unavailable, setup fails, or any action failed (the last failure).
    pub async fn run_check_for_app(&self, app_id: &str) -> Result<(), AppError> {
        let config = self.apps.get_by_id(app_id).await?;
        if config.needs_bootstrap {
            return self.bootstrap(&config).await;
        }

        let snapshot = self.collector.collect_snapshot(&config).await?;

        let (response, source) = match self.analyzer.analyze(&snapshot).await {
            Ok(response) => (response, AnalysisSource::Reasoning),
            Err(e) => {
                tracing::warn!(app_id = %app_id, error = %e, "Reasoning failed, using fallback analysis");
                (fallback_analysis(&snapshot), AnalysisSource::Fallback)
            }
        };

        let restart_targets = snapshot.container_names(app_id);
        let executor = ActionExecutor {
            runtime: self.runtime.as_ref(),
            audit: self.audit.as_ref(),
            clock: self.clock.as_ref(),
            restart_targets: &restart_targets,
        };
        let outcomes = executor.execute_all(app_id, &response, source).await;
        let failures = outcomes.iter().filter(|o| !o.success).count();

        tracing::info!(
            app_id = %app_id,
            overall_status = %response.overall_status,
            source = source.as_str(),
            actions = outcomes.len(),
            failures,
            "Check cycle complete"
        );

        match outcomes.into_iter().rev().find(|o| !o.success) {
            Some(last) => Err(AppError::Action {
                message: last.message,
            }),
            None => Ok(()),
        }
    }

    async fn bootstrap(&self, config: &AppConfig) -> Result<(), AppError> {
        tracing::info!(app_id = %config.id, "App needs bootstrap, skipping health analysis");

        let (tx, mut rx) = mpsc::channel(usize::from(TOTAL_STEPS));
        let setup = self.setup.run(config, tx);
        let record = async {
            while let Some(event) = rx.recv().await {
                self.record_progress(&config.id, &event).await;
            }
        };

        let (result, ()) = tokio::join!(setup, record);
        result.map_err(AppError::from)
    }

    async fn record_progress(&self, app_id: &str, event: &SetupProgress) {
        let (text, level) = if event.is_error {
            (
                format!(
                    "Setup step {}/{} failed: {}",
                    event.step, event.total_steps, event.message
                ),
                StatusLevel::Error,
            )
        } else {
            (
                format!(
                    "Setup step {}/{}: {}",
                    event.step, event.total_steps, event.message
                ),
                StatusLevel::Info,
            )
        };
        let details = json!({
            "step": event.step,
            "total_steps": event.total_steps,
            "detail": event.detail,
        });
        let message = NewMessage::new(app_id, self.clock.now(), text, SenderType::System)
            .with_status_level(level)
            .with_details(&details);

        if let Err(e) = self.audit.create_message(message).await {
            tracing::error!(app_id = %app_id, step = event.step, error = %e, "Failed to record setup progress");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::{ReasoningError, RuntimeError};
    use crate::reasoning::{ActionKind, LlmResponse, OverallStatus, RecommendedAction};
    use crate::runtime::{ContainerState, ContainerSummary};
    use crate::test_utils::{fixed_clock, healthy_vitals};
    use crate::traits::{MockContainerRuntime, MockHealthAnalyzer};
    use tempfile::TempDir;

    fn write_app(root: &TempDir, id: &str, needs_bootstrap: bool) {
        let dir = root.path().join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("app.yml"),
            format!(
                "id: {id}\nname: {id}\nprimary_service: app\nexpected_services:\n  - app\n  - db\nneeds_bootstrap: {needs_bootstrap}\n"
            ),
        )
        .unwrap();
        std::fs::write(
            dir.join("docker-compose.yml"),
            "services:\n  app:\n    image: nextcloud:29.0.3\n  db:\n    image: postgres:16\n",
        )
        .unwrap();
    }

    fn only_app_running() -> MockContainerRuntime {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_list_containers().returning(|| {
            Ok(vec![ContainerSummary {
                name: "appstore-nextcloud-app-1".into(),
                state: ContainerState::Running,
            }])
        });
        runtime.expect_restart_count().returning(|_| Ok(0));
        runtime.expect_logs_since().returning(|_, _| Ok(String::new()));
        runtime
    }

    async fn orchestrator(
        root: &TempDir,
        runtime: MockContainerRuntime,
        analyzer: MockHealthAnalyzer,
    ) -> (Orchestrator, Arc<SqliteStorage>) {
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(runtime);
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let apps = AppConfigProvider::new(root.path());
        let collector = Collector::new(
            Arc::clone(&runtime),
            Arc::new(healthy_vitals()),
            UptimeMonitor::new(None, Duration::from_secs(1)),
            fixed_clock(),
            "appstore",
        );
        let setup = InitialSetupHandler::new(
            Arc::clone(&runtime),
            apps.clone(),
            ResolverRegistry::new(),
            "appstore",
        );
        let orchestrator = Orchestrator::new(
            apps,
            collector,
            Arc::new(analyzer),
            runtime,
            Arc::clone(&storage) as Arc<dyn AuditStore>,
            setup,
            fixed_clock(),
        );
        (orchestrator, storage)
    }

    #[tokio::test]
    async fn test_reasoning_failure_falls_back() {
        let root = TempDir::new().unwrap();
        write_app(&root, "nextcloud", false);

        let mut analyzer = MockHealthAnalyzer::new();
        analyzer
            .expect_analyze()
            .times(1)
            .returning(|_| Err(ReasoningError::AuthenticationFailed));

        let (orchestrator, storage) = orchestrator(&root, only_app_running(), analyzer).await;
        orchestrator.run_check_for_app("nextcloud").await.unwrap();

        let messages = storage.get_messages("nextcloud", 10, 0).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status_level, Some(StatusLevel::Critical));
        assert!(messages[0].message.contains("db"));
        assert!(messages[0].message.contains("exited"));
        assert!(messages[0].details.as_deref().unwrap().contains("fallback"));
    }

    #[tokio::test]
    async fn test_failed_restart_returns_last_error_after_all_actions() {
        let root = TempDir::new().unwrap();
        write_app(&root, "nextcloud", false);

        let mut runtime = only_app_running();
        runtime.expect_restart().times(2).returning(|name, _| {
            Err(RuntimeError::CommandFailed {
                command: format!("docker restart {name}"),
                message: format!("{name}: port is already allocated"),
            })
        });

        let mut analyzer = MockHealthAnalyzer::new();
        analyzer.expect_analyze().returning(|_| {
            Ok(LlmResponse {
                overall_status: OverallStatus::Critical,
                analysis: Vec::new(),
                recommended_actions: vec![
                    RecommendedAction::new(
                        ActionKind::RestartContainer {
                            container_name: "appstore-nextcloud-app-1".into(),
                        },
                        "down",
                    ),
                    RecommendedAction::new(
                        ActionKind::RestartContainer {
                            container_name: "appstore-nextcloud-db-1".into(),
                        },
                        "down",
                    ),
                    RecommendedAction::new(ActionKind::NoAction, "done"),
                ],
            })
        });

        let (orchestrator, storage) = orchestrator(&root, runtime, analyzer).await;
        let err = orchestrator.run_check_for_app("nextcloud").await.unwrap_err();

        match err {
            AppError::Action { message } => assert!(message.contains("appstore-nextcloud-db-1")),
            other => unreachable!("unexpected error {other}"),
        }
        let messages = storage.get_messages("nextcloud", 10, 0).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.message.contains("port conflict")));
    }

    #[tokio::test]
    async fn test_unknown_app_is_an_error() {
        let root = TempDir::new().unwrap();
        let (orchestrator, _) =
            orchestrator(&root, MockContainerRuntime::new(), MockHealthAnalyzer::new()).await;

        let err = orchestrator.run_check_for_app("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::AppConfig(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_skips_analysis_and_records_progress() {
        let root = TempDir::new().unwrap();
        write_app(&root, "nextcloud", true);

        let mut runtime = MockContainerRuntime::new();
        runtime.expect_compose_pull().times(1).returning(|_, _| Ok(()));
        runtime.expect_compose_up().times(1).returning(|_, _| Ok(()));
        runtime.expect_list_containers().never();

        let mut analyzer = MockHealthAnalyzer::new();
        analyzer.expect_analyze().never();

        let (orchestrator, storage) = orchestrator(&root, runtime, analyzer).await;
        orchestrator.run_check_for_app("nextcloud").await.unwrap();

        let messages = storage.get_messages("nextcloud", 10, 0).await.unwrap();
        assert_eq!(messages.len(), 6);
        assert!(messages
            .iter()
            .all(|m| m.sender_type == SenderType::System));
        assert!(messages
            .iter()
            .any(|m| m.message == "Setup step 5/6: Starting containers"));

        let config = AppConfigProvider::new(root.path())
            .get_by_id("nextcloud")
            .await
            .unwrap();
        assert!(!config.needs_bootstrap);
    }

    #[tokio::test]
    async fn test_bootstrap_failure_is_recorded() {
        let root = TempDir::new().unwrap();
        write_app(&root, "nextcloud", true);

        let mut runtime = MockContainerRuntime::new();
        runtime.expect_compose_pull().returning(|_, _| {
            Err(RuntimeError::Timeout {
                command: "docker compose pull".into(),
                timeout_ms: 1_800_000,
            })
        });

        let (orchestrator, storage) =
            orchestrator(&root, runtime, MockHealthAnalyzer::new()).await;
        let err = orchestrator.run_check_for_app("nextcloud").await.unwrap_err();

        assert!(matches!(err, AppError::Setup(_)));
        let messages = storage.get_messages("nextcloud", 1, 0).await.unwrap();
        assert_eq!(messages[0].message, "Setup step 4/6 failed: Pulling images");
        assert_eq!(messages[0].status_level, Some(StatusLevel::Error));
    }
}
