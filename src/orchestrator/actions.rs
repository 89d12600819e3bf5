//! Action execution.
//!
//! Every action in a batch is attempted; failures are recorded and the
//! batch carries on.

use std::time::Duration;

use serde_json::json;

use crate::reasoning::{ActionKind, LlmResponse, RecommendedAction};
use crate::storage::{NewMessage, SenderType, StatusLevel};
use crate::traits::{AuditStore, ContainerRuntime, TimeProvider};

/// Time bound for a single container restart.
pub const RESTART_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a cycle's analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    /// The reasoning service answered with a valid response.
    Reasoning,
    /// The rule-based fallback ran instead.
    Fallback,
}

impl AnalysisSource {
    /// Name recorded in audit details and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of executing one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Wire key of the action.
    pub action_key: &'static str,
    /// Whether the action succeeded.
    pub success: bool,
    /// What happened.
    pub message: String,
}

impl ActionOutcome {
    fn ok(action_key: &'static str, message: impl Into<String>) -> Self {
        Self {
            action_key,
            success: true,
            message: message.into(),
        }
    }

    fn failed(action_key: &'static str, message: impl Into<String>) -> Self {
        Self {
            action_key,
            success: false,
            message: message.into(),
        }
    }
}

/// Map a free-text status word to an audit level.
///
/// Matching is case-insensitive and accepts common synonyms; anything else
/// becomes [`StatusLevel::Warning`].
#[must_use]
pub fn map_status_level(word: &str) -> StatusLevel {
    match word.trim().to_lowercase().as_str() {
        "info" | "information" | "informational" | "ok" | "healthy" | "all_ok" | "success"
        | "notice" => StatusLevel::Info,
        "warning" | "warn" | "degraded" | "caution" => StatusLevel::Warning,
        "error" | "err" | "fail" | "failed" | "failure" => StatusLevel::Error,
        "critical" | "crit" | "fatal" | "down" | "severe" | "emergency" => StatusLevel::Critical,
        other => {
            tracing::warn!(status = %other, "Unrecognized status word, using warning");
            StatusLevel::Warning
        }
    }
}

/// Executes validated actions against the runtime and the audit store.
///
/// Restarts are limited to `restart_targets`, the container names the
/// collector computed for the app.
pub struct ActionExecutor<'a> {
    pub(crate) runtime: &'a dyn ContainerRuntime,
    pub(crate) audit: &'a dyn AuditStore,
    pub(crate) clock: &'a dyn TimeProvider,
    pub(crate) restart_targets: &'a [&'a str],
}

impl ActionExecutor<'_> {
    /// Execute every action of `response` in order for `app_id`.
    pub async fn execute_all(
        &self,
        app_id: &str,
        response: &LlmResponse,
        source: AnalysisSource,
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(response.recommended_actions.len());
        for action in &response.recommended_actions {
            let outcome = self.execute(app_id, action, response, source).await;
            if !outcome.success {
                tracing::warn!(
                    app_id = %app_id,
                    action = outcome.action_key,
                    error = %outcome.message,
                    "Action failed"
                );
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn execute(
        &self,
        app_id: &str,
        action: &RecommendedAction,
        response: &LlmResponse,
        source: AnalysisSource,
    ) -> ActionOutcome {
        let key = action.kind.key();
        match &action.kind {
            ActionKind::PersistMessage {
                app_id: target,
                status,
                message,
            } => {
                let details = json!({
                    "justification": action.justification,
                    "source": source.as_str(),
                    "overall_status": response.overall_status.as_str(),
                });
                let record = NewMessage::new(target, self.clock.now(), message, SenderType::Agent)
                    .with_status_level(map_status_level(status))
                    .with_details(&details);

                match self.audit.create_message(record).await {
                    Ok(stored) => ActionOutcome::ok(key, format!("persisted message {}", stored.id)),
                    Err(e) => ActionOutcome::failed(
                        key,
                        format!("failed to persist message for {target}: {e}"),
                    ),
                }
            }
            ActionKind::RestartContainer { container_name } => {
                self.restart(app_id, container_name, &action.justification)
                    .await
            }
            ActionKind::NoAction => ActionOutcome::ok(key, "no action"),
        }
    }

    async fn restart(&self, app_id: &str, container_name: &str, justification: &str) -> ActionOutcome {
        const KEY: &str = "RESTART_CONTAINER";

        let known = self.restart_targets.iter().any(|target| *target == container_name);
        let (outcome, text, level) = if !known {
            tracing::warn!(app_id = %app_id, container = %container_name, "Refusing to restart unknown container");
            (
                ActionOutcome::failed(KEY, format!("{container_name} is not a container of {app_id}")),
                format!("Restart of {container_name} refused: not a container of this app."),
                StatusLevel::Error,
            )
        } else {
            self.attempt_restart(container_name).await
        };

        let details = json!({
            "container_name": container_name,
            "justification": justification,
            "result": outcome.message,
        });
        let record = NewMessage::new(app_id, self.clock.now(), text, SenderType::System)
            .with_status_level(level)
            .with_details(&details);

        match self.audit.create_message(record).await {
            Ok(_) => outcome,
            Err(e) if outcome.success => ActionOutcome::failed(
                KEY,
                format!("restarted {container_name} but failed to record it: {e}"),
            ),
            Err(e) => {
                tracing::error!(app_id = %app_id, error = %e, "Failed to record restart failure");
                outcome
            }
        }
    }

    async fn attempt_restart(&self, container_name: &str) -> (ActionOutcome, String, StatusLevel) {
        const KEY: &str = "RESTART_CONTAINER";

        tracing::info!(container = %container_name, "Restarting container");
        match self.runtime.restart(container_name, RESTART_TIMEOUT).await {
            Ok(()) => (
                ActionOutcome::ok(KEY, format!("restarted {container_name}")),
                format!("Restarted container {container_name}."),
                StatusLevel::Info,
            ),
            Err(e) if e.is_port_conflict() => (
                ActionOutcome::failed(KEY, format!("port conflict restarting {container_name}: {e}")),
                format!(
                    "Restart of {container_name} failed: port conflict. A host port it needs is already in use."
                ),
                StatusLevel::Error,
            ),
            Err(e) => (
                ActionOutcome::failed(KEY, format!("failed to restart {container_name}: {e}")),
                format!("Restart of {container_name} failed: {e}"),
                StatusLevel::Error,
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::{RuntimeError, StorageError};
    use crate::reasoning::OverallStatus;
    use crate::storage::StoredMessage;
    use crate::test_utils::fixed_clock;
    use crate::traits::{MockAuditStore, MockContainerRuntime};
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    #[test_case("info", StatusLevel::Info)]
    #[test_case("INFO", StatusLevel::Info)]
    #[test_case(" Healthy ", StatusLevel::Info)]
    #[test_case("warning", StatusLevel::Warning)]
    #[test_case("Degraded", StatusLevel::Warning)]
    #[test_case("error", StatusLevel::Error)]
    #[test_case("FAILED", StatusLevel::Error)]
    #[test_case("critical", StatusLevel::Critical)]
    #[test_case("Down", StatusLevel::Critical)]
    #[test_case("purple", StatusLevel::Warning)]
    #[test_case("", StatusLevel::Warning)]
    fn test_map_status_level(word: &str, expected: StatusLevel) {
        assert_eq!(map_status_level(word), expected);
    }

    const TARGETS: [&str; 3] = ["appstore-nextcloud-app-1", "x", "web"];

    fn recording_audit() -> (MockAuditStore, Arc<Mutex<Vec<NewMessage>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&written);
        let mut audit = MockAuditStore::new();
        audit.expect_create_message().returning(move |message| {
            sink.lock().unwrap().push(message.clone());
            Ok(StoredMessage::from_new("msg-1", message))
        });
        (audit, written)
    }

    fn response(actions: Vec<RecommendedAction>) -> LlmResponse {
        LlmResponse {
            overall_status: OverallStatus::Critical,
            analysis: Vec::new(),
            recommended_actions: actions,
        }
    }

    fn restart(name: &str) -> RecommendedAction {
        RecommendedAction::new(
            ActionKind::RestartContainer {
                container_name: name.into(),
            },
            "container is down",
        )
    }

    fn persist(status: &str) -> RecommendedAction {
        RecommendedAction::new(
            ActionKind::PersistMessage {
                app_id: "nextcloud".into(),
                status: status.into(),
                message: "db is down".into(),
            },
            "inform operator",
        )
    }

    #[tokio::test]
    async fn test_persist_message_writes_agent_message() {
        let runtime = MockContainerRuntime::new();
        let (audit, written) = recording_audit();
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &TARGETS,
        };

        let outcomes = executor
            .execute_all("nextcloud", &response(vec![persist("Critical")]), AnalysisSource::Fallback)
            .await;

        assert!(outcomes[0].success);
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].sender_type, SenderType::Agent);
        assert_eq!(written[0].status_level, Some(StatusLevel::Critical));
        let details: serde_json::Value =
            serde_json::from_str(written[0].details.as_deref().unwrap()).unwrap();
        assert_eq!(details["source"], "fallback");
        assert_eq!(details["overall_status"], "CRITICAL");
        assert_eq!(details["justification"], "inform operator");
    }

    #[tokio::test]
    async fn test_port_conflict_is_recorded_and_batch_continues() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_restart()
            .withf(|name, timeout| name == "appstore-nextcloud-app-1" && *timeout == RESTART_TIMEOUT)
            .times(1)
            .returning(|_, _| {
                Err(RuntimeError::CommandFailed {
                    command: "docker restart appstore-nextcloud-app-1".into(),
                    message: "Bind for 0.0.0.0:8080 failed: port is already allocated".into(),
                })
            });
        let (audit, written) = recording_audit();
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &TARGETS,
        };

        let outcomes = executor
            .execute_all(
                "nextcloud",
                &response(vec![restart("appstore-nextcloud-app-1"), persist("warning")]),
                AnalysisSource::Reasoning,
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].message.contains("port conflict"));
        assert_eq!(written[0].sender_type, SenderType::System);
        assert_eq!(written[0].status_level, Some(StatusLevel::Error));
    }

    #[tokio::test]
    async fn test_generic_restart_failure_is_distinct() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().returning(|_, _| {
            Err(RuntimeError::CommandFailed {
                command: "docker restart x".into(),
                message: "No such container: x".into(),
            })
        });
        let (audit, written) = recording_audit();
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &TARGETS,
        };

        let outcomes = executor
            .execute_all("nextcloud", &response(vec![restart("x")]), AnalysisSource::Reasoning)
            .await;

        assert!(!outcomes[0].success);
        let written = written.lock().unwrap();
        assert!(!written[0].message.contains("port conflict"));
        assert!(written[0].message.contains("No such container"));
    }

    #[tokio::test]
    async fn test_successful_restart_writes_info_message() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().returning(|_, _| Ok(()));
        let (audit, written) = recording_audit();
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &TARGETS,
        };

        let outcomes = executor
            .execute_all("nextcloud", &response(vec![restart("web")]), AnalysisSource::Reasoning)
            .await;

        assert!(outcomes[0].success);
        assert_eq!(written.lock().unwrap()[0].status_level, Some(StatusLevel::Info));
    }

    #[tokio::test]
    async fn test_audit_failure_reports_action_failed() {
        let runtime = MockContainerRuntime::new();
        let mut audit = MockAuditStore::new();
        audit.expect_create_message().returning(|_| {
            Err(StorageError::Internal {
                message: "disk full".into(),
            })
        });
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &TARGETS,
        };

        let outcomes = executor
            .execute_all(
                "nextcloud",
                &response(vec![
                    persist("info"),
                    RecommendedAction::new(ActionKind::NoAction, "nothing"),
                ]),
                AnalysisSource::Reasoning,
            )
            .await;

        assert!(!outcomes[0].success);
        assert!(outcomes[0].message.contains("disk full"));
        assert!(outcomes[1].success);
    }

    #[tokio::test]
    async fn test_restart_outside_snapshot_is_refused() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_restart().never();
        let (audit, written) = recording_audit();
        let clock = fixed_clock();
        let executor = ActionExecutor {
            runtime: &runtime,
            audit: &audit,
            clock: clock.as_ref(),
            restart_targets: &["appstore-nextcloud-app-1", "appstore-nextcloud-db-1"],
        };

        let outcomes = executor
            .execute_all(
                "nextcloud",
                &response(vec![restart("production-postgres"), restart("--time=0")]),
                AnalysisSource::Reasoning,
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.success));

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].message.contains("refused"));
        assert_eq!(written[0].sender_type, SenderType::System);
        assert_eq!(written[1].status_level, Some(StatusLevel::Error));
    }
}
