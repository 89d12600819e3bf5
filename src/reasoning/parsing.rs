//! Response parsing and validation.

use serde_json::{Map, Value};

use super::types::{
    ActionKind, AnalysisItem, ComponentStatus, LlmResponse, OverallStatus, RawAction,
    RawLlmResponse, RecommendedAction,
};
use crate::error::ReasoningError;

/// Decode model output into the wire form.
///
/// Accepts bare JSON or JSON wrapped in ```` ```json ```` / ```` ``` ```` fences.
/// If decoding fails, retries on the text between the first `{` and the
/// last `}`.
///
/// # Errors
///
/// Returns [`ReasoningError::InvalidJson`] if neither attempt decodes.
pub fn parse_response(text: &str) -> Result<RawLlmResponse, ReasoningError> {
    let body = strip_code_fence(text);

    match serde_json::from_str::<RawLlmResponse>(body) {
        Ok(raw) => Ok(raw),
        Err(first) => {
            let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
                return Err(ReasoningError::InvalidJson {
                    message: first.to_string(),
                });
            };
            if end <= start {
                return Err(ReasoningError::InvalidJson {
                    message: first.to_string(),
                });
            }
            serde_json::from_str(&text[start..=end]).map_err(|e| ReasoningError::InvalidJson {
                message: e.to_string(),
            })
        }
    }
}

/// Remove one surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline
    let rest = rest.find('\n').map_or("", |n| &rest[n + 1..]);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Convert the wire form into typed actions, rejecting the whole response on
/// the first schema violation.
///
/// # Errors
///
/// Returns [`ReasoningError::Validation`] naming the offending field.
pub fn validate_response(raw: RawLlmResponse) -> Result<LlmResponse, ReasoningError> {
    let overall_status = OverallStatus::parse(&raw.overall_status).ok_or_else(|| {
        invalid(
            "overall_status",
            format!("unknown value '{}'", raw.overall_status),
        )
    })?;

    let analysis = raw
        .analysis
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if item.component.trim().is_empty() {
                return Err(invalid(format!("analysis[{i}].component"), "must not be empty"));
            }
            let status = ComponentStatus::parse(&item.status).ok_or_else(|| {
                invalid(
                    format!("analysis[{i}].status"),
                    format!("unknown value '{}'", item.status),
                )
            })?;
            Ok(AnalysisItem {
                component: item.component,
                status,
                finding: item.finding,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let recommended_actions = raw
        .recommended_actions
        .into_iter()
        .enumerate()
        .map(|(i, action)| validate_action(i, action))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LlmResponse {
        overall_status,
        analysis,
        recommended_actions,
    })
}

fn validate_action(index: usize, action: RawAction) -> Result<RecommendedAction, ReasoningError> {
    let params = action.parameters.unwrap_or_default();
    let field = |name: &str| format!("recommended_actions[{index}].parameters.{name}");

    let kind = match action.action_key.as_str() {
        "PERSIST_MESSAGE" => ActionKind::PersistMessage {
            app_id: required_param(&params, "app_id", &field)?,
            status: required_param(&params, "status", &field)?,
            message: required_param(&params, "message", &field)?,
        },
        "RESTART_CONTAINER" => ActionKind::RestartContainer {
            container_name: required_param(&params, "container_name", &field)?,
        },
        "NO_ACTION" => ActionKind::NoAction,
        other => {
            return Err(invalid(
                format!("recommended_actions[{index}].action_key"),
                format!("unknown value '{other}'"),
            ))
        }
    };

    Ok(RecommendedAction::new(kind, action.justification))
}

fn required_param(
    params: &Map<String, Value>,
    name: &str,
    field: &impl Fn(&str) -> String,
) -> Result<String, ReasoningError> {
    match params.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(invalid(field(name), "must not be empty")),
        Some(_) => Err(invalid(field(name), "must be a string")),
        None => Err(invalid(field(name), "is required")),
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ReasoningError {
    ReasoningError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}
