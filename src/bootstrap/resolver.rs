//! Image version resolvers.
//!
//! Bootstrap step 2 asks the [`ResolverRegistry`] for a pinned reference per
//! unpinned image. Families without a registered resolver fall through to
//! [`NoopResolver`] and keep their reference as written.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::compose::{image_family, is_valid_tag, pin_reference};
use crate::traits::ContainerRuntime;

/// Resolves an unpinned image reference to a pinned one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// Pinned reference for `image_ref`, or `None` to leave it unchanged.
    async fn resolve_version(&self, image_ref: &str) -> Option<String>;
}

/// Leaves every image unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl VersionResolver for NoopResolver {
    async fn resolve_version(&self, _image_ref: &str) -> Option<String> {
        None
    }
}

/// Pulls the image and pins it to its `org.opencontainers.image.version` label.
pub struct RuntimeLabelResolver {
    runtime: Arc<dyn ContainerRuntime>,
}

impl RuntimeLabelResolver {
    /// Create a resolver sharing the orchestrator's runtime client.
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl VersionResolver for RuntimeLabelResolver {
    async fn resolve_version(&self, image_ref: &str) -> Option<String> {
        match self.runtime.image_version_label(image_ref).await {
            Ok(Some(version)) if is_valid_tag(&version) => Some(pin_reference(image_ref, &version)),
            Ok(Some(version)) => {
                tracing::warn!(image = %image_ref, version = %version, "Version label is not a valid tag");
                None
            }
            Ok(None) => {
                tracing::info!(image = %image_ref, "Image has no version label");
                None
            }
            Err(e) => {
                tracing::warn!(image = %image_ref, error = %e, "Version lookup failed");
                None
            }
        }
    }
}

/// Per-family resolver table with a default.
pub struct ResolverRegistry {
    default: Arc<dyn VersionResolver>,
    by_family: HashMap<String, Arc<dyn VersionResolver>>,
}

impl ResolverRegistry {
    /// Registry whose default leaves images unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default: Arc::new(NoopResolver),
            by_family: HashMap::new(),
        }
    }

    /// Registry resolving each of `families` from runtime image labels.
    #[must_use]
    pub fn with_label_families(families: &[String], runtime: &Arc<dyn ContainerRuntime>) -> Self {
        let label: Arc<dyn VersionResolver> =
            Arc::new(RuntimeLabelResolver::new(Arc::clone(runtime)));
        families.iter().fold(Self::new(), |registry, family| {
            registry.register(family, Arc::clone(&label))
        })
    }

    /// Use `resolver` for images of `family` (see [`image_family`]).
    #[must_use]
    pub fn register(mut self, family: &str, resolver: Arc<dyn VersionResolver>) -> Self {
        self.by_family.insert(image_family(family), resolver);
        self
    }

    /// Pinned reference for `image_ref` from its family's resolver.
    pub async fn resolve(&self, image_ref: &str) -> Option<String> {
        let resolver = self
            .by_family
            .get(&image_family(image_ref))
            .unwrap_or(&self.default);
        resolver.resolve_version(image_ref).await
    }

    /// Number of families with a dedicated resolver.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_family.len()
    }

    /// True if no family has a dedicated resolver.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_family.is_empty()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
