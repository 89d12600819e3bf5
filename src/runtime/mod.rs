//! Container runtime client.
//!
//! The orchestrator talks to the runtime only through
//! [`crate::traits::ContainerRuntime`]; [`DockerCli`] is the production
//! implementation.

mod docker;
mod types;

pub use docker::{DockerCli, LONG_COMMAND_TIMEOUT, QUERY_TIMEOUT};
pub use types::{ContainerState, ContainerSummary};
