//! First-run setup for apps flagged with `needs_bootstrap`.
//!
//! [`InitialSetupHandler::run`] walks six ordered steps and reports each one
//! on a progress channel:
//!
//! | Step | Work |
//! |------|------|
//! | 1 | Detect images declared in the compose file |
//! | 2 | Resolve pinned references for unpinned images |
//! | 3 | Rewrite the compose file with the pinned references |
//! | 4 | `docker compose pull` |
//! | 5 | `docker compose up -d` |
//! | 6 | Clear the bootstrap flag in `app.yml` |
//!
//! A failed step aborts the rest. Re-running after a failure is safe: steps
//! 1-3 see the already-pinned file and change nothing, and steps 4-5 converge
//! a partially started stack.

mod compose;
mod locks;
mod resolver;

pub use compose::{
    detect_images, image_family, is_unpinned, is_valid_tag, pin_reference, rewrite_images,
    ServiceImage,
};
pub use locks::FileLocks;
pub use resolver::{NoopResolver, ResolverRegistry, RuntimeLabelResolver, VersionResolver};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::apps::{AppConfig, AppConfigProvider};
use crate::error::SetupError;
use crate::traits::ContainerRuntime;

/// Number of bootstrap steps.
pub const TOTAL_STEPS: u8 = 6;

/// Fixed human-readable title of a step.
#[must_use]
pub const fn step_title(step: u8) -> &'static str {
    match step {
        1 => "Detecting container images",
        2 => "Resolving image versions",
        3 => "Updating compose file",
        4 => "Pulling images",
        5 => "Starting containers",
        6 => "Finalizing setup",
        _ => "Unknown setup step",
    }
}

/// One progress report from the setup handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupProgress {
    /// One-based step index.
    pub step: u8,
    /// Always [`TOTAL_STEPS`].
    pub total_steps: u8,
    /// Step title, see [`step_title`].
    pub message: String,
    /// What the step did, or why it failed.
    pub detail: Option<String>,
    /// True if the step failed and setup stopped.
    pub is_error: bool,
}

impl SetupProgress {
    fn completed(step: u8, detail: Option<String>) -> Self {
        Self {
            step,
            total_steps: TOTAL_STEPS,
            message: step_title(step).to_string(),
            detail,
            is_error: false,
        }
    }

    fn failed(step: u8, reason: String) -> Self {
        Self {
            step,
            total_steps: TOTAL_STEPS,
            message: step_title(step).to_string(),
            detail: Some(reason),
            is_error: true,
        }
    }
}

type StepOutcome<T> = Result<(T, Option<String>), String>;

/// Runs the six-step bootstrap for one app.
pub struct InitialSetupHandler {
    runtime: Arc<dyn ContainerRuntime>,
    apps: AppConfigProvider,
    resolvers: ResolverRegistry,
    locks: FileLocks,
    container_prefix: String,
}

impl InitialSetupHandler {
    /// Create a handler sharing the orchestrator's runtime client.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        apps: AppConfigProvider,
        resolvers: ResolverRegistry,
        container_prefix: impl Into<String>,
    ) -> Self {
        Self {
            runtime,
            apps,
            resolvers,
            locks: FileLocks::new(),
            container_prefix: container_prefix.into(),
        }
    }

    /// Bootstrap `config`, reporting each step on `progress`.
    ///
    /// A closed progress channel does not stop setup.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::StepFailed`] for the first step that fails; the
    /// remaining steps are not attempted.
    pub async fn run(
        &self,
        config: &AppConfig,
        progress: mpsc::Sender<SetupProgress>,
    ) -> Result<(), SetupError> {
        let compose_path = config.compose_path();
        let project = config.project_name(&self.container_prefix);
        tracing::info!(app_id = %config.id, project = %project, "Starting initial setup");

        let images = report(&progress, 1, Self::detect(&compose_path).await).await?;
        let replacements = report(&progress, 2, self.resolve(&images).await).await?;
        report(&progress, 3, self.rewrite(&compose_path, &replacements).await).await?;

        let pulled = self
            .runtime
            .compose_pull(&compose_path, &project)
            .await
            .map(|()| ((), None))
            .map_err(|e| e.to_string());
        report(&progress, 4, pulled).await?;

        let started = self
            .runtime
            .compose_up(&compose_path, &project)
            .await
            .map(|()| ((), Some(format!("project {project} is up"))))
            .map_err(|e| e.to_string());
        report(&progress, 5, started).await?;

        report(&progress, 6, self.finalize(config).await).await?;

        tracing::info!(app_id = %config.id, "Initial setup complete");
        Ok(())
    }

    async fn detect(compose_path: &Path) -> StepOutcome<Vec<ServiceImage>> {
        let content = tokio::fs::read_to_string(compose_path)
            .await
            .map_err(|e| format!("failed to read {}: {e}", compose_path.display()))?;
        let images = detect_images(&content)
            .map_err(|e| format!("invalid compose file {}: {e}", compose_path.display()))?;

        let detail = images
            .iter()
            .map(|i| format!("{}={}", i.service, i.image))
            .collect::<Vec<_>>()
            .join(", ");
        Ok((images, Some(detail)))
    }

    async fn resolve(&self, images: &[ServiceImage]) -> StepOutcome<HashMap<String, String>> {
        let mut replacements = HashMap::new();

        for ServiceImage { image, .. } in images {
            if !is_unpinned(image) || replacements.contains_key(image) {
                continue;
            }
            if let Some(pinned) = self.resolvers.resolve(image).await {
                if pinned != *image {
                    tracing::info!(image = %image, pinned = %pinned, "Pinned image version");
                    replacements.insert(image.clone(), pinned);
                }
            }
        }

        let detail = if replacements.is_empty() {
            "no images to pin".to_string()
        } else {
            let mut pairs: Vec<_> = replacements
                .iter()
                .map(|(from, to)| format!("{from} -> {to}"))
                .collect();
            pairs.sort();
            pairs.join(", ")
        };
        Ok((replacements, Some(detail)))
    }

    async fn rewrite(
        &self,
        compose_path: &Path,
        replacements: &HashMap<String, String>,
    ) -> StepOutcome<()> {
        if replacements.is_empty() {
            return Ok(((), Some("compose file unchanged".into())));
        }

        let _guard = self.locks.lock(compose_path).await;
        let content = tokio::fs::read_to_string(compose_path)
            .await
            .map_err(|e| format!("failed to read {}: {e}", compose_path.display()))?;
        let (updated, changed) = rewrite_images(&content, replacements);
        if changed > 0 {
            tokio::fs::write(compose_path, updated)
                .await
                .map_err(|e| format!("failed to write {}: {e}", compose_path.display()))?;
        }
        Ok(((), Some(format!("updated {changed} image reference(s)"))))
    }

    async fn finalize(&self, config: &AppConfig) -> StepOutcome<()> {
        let _guard = self.locks.lock(&config.config_path()).await;
        self.apps
            .clear_bootstrap_flag(config)
            .await
            .map(|()| ((), None))
            .map_err(|e| e.to_string())
    }
}

async fn report<T>(
    progress: &mpsc::Sender<SetupProgress>,
    step: u8,
    outcome: StepOutcome<T>,
) -> Result<T, SetupError> {
    let (event, result) = match outcome {
        Ok((value, detail)) => (SetupProgress::completed(step, detail), Ok(value)),
        Err(message) => {
            tracing::error!(step, error = %message, "Setup step failed");
            (
                SetupProgress::failed(step, message.clone()),
                Err(SetupError::StepFailed { step, message }),
            )
        }
    };

    if progress.send(event).await.is_err() {
        tracing::debug!(step, "Progress receiver dropped");
    }
    result
}
