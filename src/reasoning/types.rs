//! Reasoning response types.
//!
//! Two shapes of the same document:
//! - [`RawLlmResponse`]: exactly what the model emitted, string-typed
//! - [`LlmResponse`]: the validated form with closed enums and typed actions
//!
//! [`super::validate_response`] is the only way from one to the other.

use serde::{Deserialize, Serialize};

/// Wire form of a reasoning response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawLlmResponse {
    /// `ALL_OK`, `WARNING` or `CRITICAL`.
    #[serde(default)]
    pub overall_status: String,
    /// Per-component findings.
    #[serde(default)]
    pub analysis: Vec<RawAnalysisItem>,
    /// Actions to execute, in order.
    #[serde(default)]
    pub recommended_actions: Vec<RawAction>,
}

/// Wire form of one finding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawAnalysisItem {
    /// Component the finding is about.
    #[serde(default)]
    pub component: String,
    /// `OK`, `WARN` or `FAIL`.
    #[serde(default)]
    pub status: String,
    /// Free text.
    #[serde(default)]
    pub finding: String,
}

/// Wire form of one action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawAction {
    /// `PERSIST_MESSAGE`, `RESTART_CONTAINER` or `NO_ACTION`.
    #[serde(default)]
    pub action_key: String,
    /// Action parameters; `null` and absent are both empty.
    #[serde(default)]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Why the model recommends it.
    #[serde(default)]
    pub justification: String,
}

/// Overall verdict, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// Nothing to report.
    AllOk,
    /// Degraded.
    Warning,
    /// Down or failing.
    Critical,
}

impl OverallStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllOk => "ALL_OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse the wire name (exact match).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALL_OK" => Some(Self::AllOk),
            "WARNING" => Some(Self::Warning),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentStatus {
    /// Healthy.
    Ok,
    /// Degraded.
    Warn,
    /// Failing.
    Fail,
}

impl ComponentStatus {
    /// Parse the wire name (exact match).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Self::Ok),
            "WARN" => Some(Self::Warn),
            "FAIL" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// One validated finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisItem {
    /// Non-empty component name.
    pub component: String,
    /// Verdict.
    pub status: ComponentStatus,
    /// Free text.
    pub finding: String,
}

/// Typed remediation instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Append an audit message.
    PersistMessage {
        /// App the message is attributed to.
        app_id: String,
        /// Free-text status word, mapped to a level at execution time.
        status: String,
        /// Message text.
        message: String,
    },
    /// Restart one container by its canonical name.
    RestartContainer {
        /// Name copied from the snapshot.
        container_name: String,
    },
    /// Do nothing.
    NoAction,
}

impl ActionKind {
    /// Wire `action_key`.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::PersistMessage { .. } => "PERSIST_MESSAGE",
            Self::RestartContainer { .. } => "RESTART_CONTAINER",
            Self::NoAction => "NO_ACTION",
        }
    }
}

/// One validated action with its justification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendedAction {
    /// What to do.
    pub kind: ActionKind,
    /// Why.
    pub justification: String,
}

impl RecommendedAction {
    /// Pair an action with its justification.
    #[must_use]
    pub fn new(kind: ActionKind, justification: impl Into<String>) -> Self {
        Self {
            kind,
            justification: justification.into(),
        }
    }
}

/// Validated reasoning response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Overall verdict.
    pub overall_status: OverallStatus,
    /// Findings.
    pub analysis: Vec<AnalysisItem>,
    /// Actions, executed in order.
    pub recommended_actions: Vec<RecommendedAction>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_severity_order() {
        assert!(OverallStatus::AllOk < OverallStatus::Warning);
        assert!(OverallStatus::Warning < OverallStatus::Critical);
        assert_eq!(
            [OverallStatus::Warning, OverallStatus::Critical, OverallStatus::AllOk]
                .into_iter()
                .max(),
            Some(OverallStatus::Critical)
        );
    }

    #[test]
    fn test_overall_status_parse_is_exact() {
        assert_eq!(OverallStatus::parse("ALL_OK"), Some(OverallStatus::AllOk));
        assert_eq!(OverallStatus::parse("all_ok"), None);
        assert_eq!(
            serde_json::to_string(&OverallStatus::AllOk).unwrap(),
            "\"ALL_OK\""
        );
    }

    #[test]
    fn test_component_status_parse() {
        assert_eq!(ComponentStatus::parse("WARN"), Some(ComponentStatus::Warn));
        assert_eq!(ComponentStatus::parse("WARNING"), None);
    }

    #[test]
    fn test_raw_action_null_parameters() {
        let raw: RawAction =
            serde_json::from_str(r#"{"action_key": "NO_ACTION", "parameters": null}"#).unwrap();
        assert_eq!(raw.parameters, None);
        assert_eq!(raw.justification, "");
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(ActionKind::NoAction.key(), "NO_ACTION");
        assert_eq!(
            ActionKind::RestartContainer {
                container_name: "x".into()
            }
            .key(),
            "RESTART_CONTAINER"
        );
    }
}
