//! Rule-based analysis used when the reasoning service is unavailable.

use crate::collector::{AppStatus, ServiceState, SystemSnapshot};
use crate::reasoning::{
    ActionKind, AnalysisItem, ComponentStatus, LlmResponse, OverallStatus, RecommendedAction,
};

/// Restart counts above this are reported as a warning.
pub const RESTART_COUNT_THRESHOLD: u32 = 5;

/// Deterministic analysis of `snapshot`.
///
/// Per app: the first service not running is critical; otherwise the first
/// service restarting more than [`RESTART_COUNT_THRESHOLD`] times is a warning;
/// otherwise all is well. Produces exactly one `PERSIST_MESSAGE` per app and
/// never a restart.
#[must_use]
pub fn fallback_analysis(snapshot: &SystemSnapshot) -> LlmResponse {
    let mut overall_status = OverallStatus::AllOk;
    let mut analysis = Vec::with_capacity(snapshot.apps.len());
    let mut recommended_actions = Vec::with_capacity(snapshot.apps.len());

    for app in &snapshot.apps {
        let (status, component, message) = assess(app);
        overall_status = overall_status.max(status);

        analysis.push(AnalysisItem {
            component,
            status: match status {
                OverallStatus::AllOk => ComponentStatus::Ok,
                OverallStatus::Warning => ComponentStatus::Warn,
                OverallStatus::Critical => ComponentStatus::Fail,
            },
            finding: message.clone(),
        });
        recommended_actions.push(RecommendedAction::new(
            ActionKind::PersistMessage {
                app_id: app.app_id.clone(),
                status: status_word(status).to_string(),
                message,
            },
            "Reasoning service unavailable; rule-based fallback analysis",
        ));
    }

    LlmResponse {
        overall_status,
        analysis,
        recommended_actions,
    }
}

fn assess(app: &AppStatus) -> (OverallStatus, String, String) {
    let services = &app.actual_state.services;

    if let Some(down) = services.iter().find(|s| s.status != ServiceState::Running) {
        return (
            OverallStatus::Critical,
            down.name.clone(),
            format!(
                "{}: service '{}' is {}",
                app.app_name, down.name, down.status
            ),
        );
    }

    if let Some(flapping) = services
        .iter()
        .find(|s| s.restart_count > RESTART_COUNT_THRESHOLD)
    {
        return (
            OverallStatus::Warning,
            flapping.name.clone(),
            format!(
                "{}: service '{}' has a high restart count ({})",
                app.app_name, flapping.name, flapping.restart_count
            ),
        );
    }

    (
        OverallStatus::AllOk,
        app.app_id.clone(),
        "All services running normally".to_string(),
    )
}

const fn status_word(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::AllOk => "info",
        OverallStatus::Warning => "warning",
        OverallStatus::Critical => "critical",
    }
}
