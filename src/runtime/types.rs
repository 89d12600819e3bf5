//! Container listing types.

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Process is up.
    Running,
    /// Runtime is restarting the container.
    Restarting,
    /// Process exited.
    Exited,
    /// Created but never started.
    Created,
    /// Frozen.
    Paused,
    /// Removal failed half-way.
    Dead,
    /// Any state string this crate does not know.
    Unknown,
}

impl ContainerState {
    /// Parse the runtime's state word (case-insensitive).
    #[must_use]
    pub fn parse(state: &str) -> Self {
        match state.trim().to_lowercase().as_str() {
            "running" => Self::Running,
            "restarting" => Self::Restarting,
            "exited" => Self::Exited,
            "created" => Self::Created,
            "paused" => Self::Paused,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }
}

/// One row of the runtime's container listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Container name without the leading `/`.
    pub name: String,
    /// Current state.
    pub state: ContainerState,
}

/// Shape of one `docker ps --format '{{json .}}'` line; other keys are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct PsLine {
    #[serde(rename = "Names", default)]
    pub names: String,
    #[serde(rename = "State", default)]
    pub state: String,
}
