//! [`ContainerRuntime`] backed by the `docker` CLI.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::process::Command as AsyncCommand;

use super::types::{ContainerState, ContainerSummary, PsLine};
use crate::error::RuntimeError;
use crate::traits::ContainerRuntime;

/// Bound for listing, inspection and log commands.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound for image pulls and compose operations.
pub const LONG_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const VERSION_LABEL: &str = "org.opencontainers.image.version";

/// Drives the `docker` binary through `tokio::process`.
///
/// Every child is spawned with `kill_on_drop`, so cancelling a cycle also
/// stops the commands it started.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    /// Create a client for `binary` (a name on `PATH` or an absolute path).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run one command, returning stdout and stderr on success.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<(String, String), RuntimeError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(command = %command, "Running container runtime command");

        let child = AsyncCommand::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| RuntimeError::Timeout {
                command: command.clone(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| RuntimeError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let message = if stderr.trim().is_empty() {
                format!("exit status {}: {}", output.status, stdout.trim())
            } else {
                stderr.trim().to_string()
            };
            return Err(RuntimeError::CommandFailed { command, message });
        }

        Ok((stdout, stderr))
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let (stdout, _) = self
            .run(&["ps", "-a", "--no-trunc", "--format", "{{json .}}"], QUERY_TIMEOUT)
            .await?;
        parse_ps_output(&stdout)
    }

    async fn restart_count(&self, container_name: &str) -> Result<u32, RuntimeError> {
        let (stdout, _) = self
            .run(
                &["inspect", "--format", "{{.RestartCount}}", "--", container_name],
                QUERY_TIMEOUT,
            )
            .await?;
        parse_restart_count(&stdout)
    }

    async fn logs_since(
        &self,
        container_name: &str,
        since: DateTime<Utc>,
    ) -> Result<String, RuntimeError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let (stdout, stderr) = self
            .run(&["logs", "--since", &since, "--", container_name], QUERY_TIMEOUT)
            .await?;

        // Containers log to both streams
        Ok(if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() {
            stderr
        } else {
            format!("{stdout}\n{stderr}")
        })
    }

    async fn restart(&self, container_name: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let args = restart_args(container_name, timeout);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args, timeout).await?;
        tracing::info!(container = %container_name, "Container restarted");
        Ok(())
    }

    async fn image_version_label(&self, image_ref: &str) -> Result<Option<String>, RuntimeError> {
        self.run(&["pull", image_ref], LONG_COMMAND_TIMEOUT).await?;

        let format = format!("{{{{ index .Config.Labels \"{VERSION_LABEL}\" }}}}");
        let (stdout, _) = self
            .run(&["image", "inspect", "--format", &format, image_ref], QUERY_TIMEOUT)
            .await?;
        Ok(parse_label_output(&stdout))
    }

    async fn compose_pull(&self, compose_file: &Path, project: &str) -> Result<(), RuntimeError> {
        let file = compose_file.display().to_string();
        self.run(
            &["compose", "-f", &file, "-p", project, "pull"],
            LONG_COMMAND_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn compose_up(&self, compose_file: &Path, project: &str) -> Result<(), RuntimeError> {
        let file = compose_file.display().to_string();
        self.run(
            &["compose", "-f", &file, "-p", project, "up", "-d"],
            LONG_COMMAND_TIMEOUT,
        )
        .await?;
        Ok(())
    }
}

/// Arguments for `docker restart`.
///
/// The stop grace period is half of `timeout` so the kill still lands inside
/// the overall bound. `--` keeps a name that looks like a flag from being
/// parsed as one.
pub(crate) fn restart_args(container_name: &str, timeout: Duration) -> Vec<String> {
    let grace = (timeout.as_secs() / 2).max(1);
    vec![
        "restart".to_string(),
        "-t".to_string(),
        grace.to_string(),
        "--".to_string(),
        container_name.to_string(),
    ]
}

/// Parse `docker ps --format '{{json .}}'` output, one JSON object per line.
pub(crate) fn parse_ps_output(output: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
    let mut containers = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let row: PsLine = serde_json::from_str(line).map_err(|e| RuntimeError::Parse {
            message: format!("invalid container listing line: {e}"),
        })?;
        let state = ContainerState::parse(&row.state);

        for name in row.names.split(',').map(|n| n.trim().trim_start_matches('/')) {
            if !name.is_empty() {
                containers.push(ContainerSummary {
                    name: name.to_string(),
                    state,
                });
            }
        }
    }

    Ok(containers)
}

pub(crate) fn parse_restart_count(output: &str) -> Result<u32, RuntimeError> {
    let trimmed = output.trim();
    trimmed.parse().map_err(|_| RuntimeError::Parse {
        message: format!("invalid restart count '{trimmed}'"),
    })
}

/// Go templates print `<no value>` for a missing label on some daemons.
pub(crate) fn parse_label_output(output: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() || trimmed == "<no value>" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_ps_output() {
        let output = concat!(
            r#"{"ID":"abc","Image":"nextcloud:29","Names":"appstore-nextcloud-app-1","State":"running","Status":"Up 2 hours"}"#,
            "\n",
            r#"{"ID":"def","Image":"postgres:16","Names":"appstore-nextcloud-db-1","State":"exited","Status":"Exited (1)"}"#,
            "\n\n"
        );

        let containers = parse_ps_output(output).unwrap();
        assert_eq!(
            containers,
            vec![
                ContainerSummary {
                    name: "appstore-nextcloud-app-1".into(),
                    state: ContainerState::Running,
                },
                ContainerSummary {
                    name: "appstore-nextcloud-db-1".into(),
                    state: ContainerState::Exited,
                },
            ]
        );
    }

    #[test]
    fn test_parse_ps_output_multiple_names() {
        let output = r#"{"Names":"/web,legacy-alias","State":"restarting"}"#;
        let containers = parse_ps_output(output).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "web");
        assert_eq!(containers[1].state, ContainerState::Restarting);
    }

    #[test]
    fn test_parse_ps_output_empty() {
        assert!(parse_ps_output("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_ps_output_garbage() {
        let err = parse_ps_output("not json").unwrap_err();
        assert!(matches!(err, RuntimeError::Parse { .. }));
    }

    #[test]
    fn test_parse_restart_count() {
        assert_eq!(parse_restart_count("7\n").unwrap(), 7);
        assert!(parse_restart_count("seven").is_err());
    }

    #[test]
    fn test_parse_label_output() {
        assert_eq!(parse_label_output("29.0.3\n"), Some("29.0.3".into()));
        assert_eq!(parse_label_output("<no value>\n"), None);
        assert_eq!(parse_label_output("   "), None);
    }

    #[test]
    fn test_restart_args_bound_grace_and_end_options() {
        assert_eq!(
            restart_args("appstore-nextcloud-app-1", Duration::from_secs(30)),
            vec!["restart", "-t", "15", "--", "appstore-nextcloud-app-1"]
        );
        assert_eq!(
            restart_args("--time=0", Duration::from_millis(500)),
            vec!["restart", "-t", "1", "--", "--time=0"]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_for_missing_binary() {
        let cli = DockerCli::new("/definitely/not/a/docker/binary");
        let err = cli.list_containers().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let cli = DockerCli::new("false");
        let err = cli
            .restart("web", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::CommandFailed { .. }));
        assert!(!err.is_port_conflict());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_listing_from_silent_binary() {
        let cli = DockerCli::new("true");
        assert!(cli.list_containers().await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_timeout() {
        let cli = DockerCli::new("sleep");
        let err = cli
            .run(&["5"], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Timeout { timeout_ms: 50, .. }));
    }
}
