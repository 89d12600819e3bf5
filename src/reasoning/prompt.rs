//! Prompt rendering.

use crate::collector::SystemSnapshot;
use crate::error::ReasoningError;

const INSTRUCTIONS: &str = r#"You are the health-monitoring agent of a self-hosted app store.
Analyze the system snapshot below and decide what, if anything, must be done.

Respond with a single JSON object and nothing else, using exactly this schema:
{
  "overall_status": "ALL_OK" | "WARNING" | "CRITICAL",
  "analysis": [
    {"component": "<service or resource name>", "status": "OK" | "WARN" | "FAIL", "finding": "<one sentence>"}
  ],
  "recommended_actions": [
    {"action_key": "<action>", "parameters": {<string values only>}, "justification": "<one sentence>"}
  ]
}

"action_key" must be one of:
- "PERSIST_MESSAGE": parameters "app_id", "status" (info, warning, error or critical) and "message" are required.
- "RESTART_CONTAINER": parameter "container_name" is required.
- "NO_ACTION": no parameters.

Rules:
- "app_id" must be the "app_id" value from the snapshot, never the app's display name.
- "container_name" must be copied verbatim from a service's "container_name" in the snapshot. Never construct or guess container names.
- Never recommend RESTART_CONTAINER for a service whose "container_exists" is false; that container was never created and a restart cannot succeed.
- Always include at least one PERSIST_MESSAGE summarizing the app's state for the operator.
- Use "CRITICAL" when an expected service is not running or the uptime status is DOWN, "WARNING" for high restart counts, log errors or resource pressure, otherwise "ALL_OK"."#;

/// Render the analysis prompt for `snapshot`.
///
/// The output embeds the current time and the exact
/// `serde_json::to_string_pretty` encoding of the snapshot.
///
/// # Errors
///
/// Returns [`ReasoningError::InvalidJson`] if the snapshot cannot be encoded.
pub fn generate_prompt(snapshot: &SystemSnapshot) -> Result<String, ReasoningError> {
    let snapshot_json =
        serde_json::to_string_pretty(snapshot).map_err(|e| ReasoningError::InvalidJson {
            message: format!("failed to encode snapshot: {e}"),
        })?;

    Ok(format!(
        "{INSTRUCTIONS}\n\nCurrent time: {}\n\nSystem snapshot:\n{snapshot_json}\n",
        snapshot.timestamp.to_rfc3339()
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collector::{ServiceState, ServiceStatus};
    use crate::test_utils::snapshot_with;

    #[test]
    fn test_prompt_embeds_exact_snapshot_json_and_time() {
        let snapshot = snapshot_with(
            "nextcloud",
            vec![ServiceStatus::missing("db", "appstore-nextcloud-db-1")],
        );

        let prompt = generate_prompt(&snapshot).unwrap();

        assert!(prompt.contains(&serde_json::to_string_pretty(&snapshot).unwrap()));
        assert!(prompt.contains(&snapshot.timestamp.to_rfc3339()));
    }

    #[test]
    fn test_prompt_states_contract() {
        let mut service = ServiceStatus::missing("app", "appstore-nextcloud-app-1");
        service.status = ServiceState::Running;
        let prompt = generate_prompt(&snapshot_with("nextcloud", vec![service])).unwrap();

        for key in ["PERSIST_MESSAGE", "RESTART_CONTAINER", "NO_ACTION"] {
            assert!(prompt.contains(key), "missing {key}");
        }
        assert!(prompt.contains("never the app's display name"));
        assert!(prompt.contains("copied verbatim"));
        assert!(prompt.contains("\"container_exists\""));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let snapshot = snapshot_with("gitea", Vec::new());
        assert_eq!(
            generate_prompt(&snapshot).unwrap(),
            generate_prompt(&snapshot).unwrap()
        );
    }
}
