//! Per-app declarative configs.
//!
//! Every immediate subdirectory of the apps root may hold an [`APP_CONFIG_FILE`]
//! describing one managed application:
//!
//! ```yaml
//! id: nextcloud
//! name: Nextcloud
//! primary_service: app
//! uptime_monitor_ref: nextcloud-web
//! expected_services: [app, db]
//! needs_bootstrap: false
//! ```
//!
//! Configs are re-read at the start of every cycle so edits made by the
//! dashboard are picked up without a restart.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppConfigError;

/// File name of the per-app config inside an app directory.
pub const APP_CONFIG_FILE: &str = "app.yml";

/// File name of the compose definition inside an app directory.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// One managed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Stable identifier, used for container naming and audit attribution.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Service that serves the app's UI.
    pub primary_service: String,
    /// Reference of the uptime monitor watching this app, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_monitor_ref: Option<String>,
    /// Logical service names that should be running, in declaration order.
    pub expected_services: Vec<String>,
    /// Whether the first-time bootstrap still has to run.
    #[serde(default)]
    pub needs_bootstrap: bool,
    /// Directory the config was loaded from.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl AppConfig {
    /// Path of this app's config file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(APP_CONFIG_FILE)
    }

    /// Path of this app's compose definition.
    #[must_use]
    pub fn compose_path(&self) -> PathBuf {
        self.dir.join(COMPOSE_FILE)
    }

    /// Compose project name: `<prefix>-<lowercased-id>`.
    #[must_use]
    pub fn project_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.id.to_lowercase())
    }

    /// Canonical container name of the first instance of `service`.
    ///
    /// This is the only way container identity is derived; nothing else
    /// may construct container names.
    #[must_use]
    pub fn container_name(&self, prefix: &str, service: &str) -> String {
        format!("{}-{service}-1", self.project_name(prefix))
    }
}

/// Loose on-disk shape, checked field by field in [`AppConfigProvider::load`].
#[derive(Debug, Deserialize)]
struct RawAppConfig {
    id: Option<String>,
    name: Option<String>,
    primary_service: Option<String>,
    uptime_monitor_ref: Option<serde_yaml::Value>,
    expected_services: Option<Vec<String>>,
    needs_bootstrap: Option<bool>,
}

/// Discovers app configs below a root directory.
#[derive(Debug, Clone)]
pub struct AppConfigProvider {
    root: PathBuf,
}

impl AppConfigProvider {
    /// Create a provider for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory scanned for apps.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every valid app config below the root, sorted by id.
    ///
    /// Malformed or incomplete files are logged and skipped; non-directories
    /// and directories without a config file are ignored. An unreadable root
    /// yields an empty list.
    pub async fn get_all(&self) -> Vec<AppConfig> {
        let mut apps = Vec::new();

        for path in self.candidate_files().await {
            match Self::load(&path).await {
                Ok(config) => apps.push(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping invalid app config");
                }
            }
        }

        apps.sort_by(|a, b| a.id.cmp(&b.id));
        apps
    }

    /// Resolve one app config by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppConfigError::NotFound`] if no valid config carries `app_id`.
    pub async fn get_by_id(&self, app_id: &str) -> Result<AppConfig, AppConfigError> {
        for path in self.candidate_files().await {
            match Self::load(&path).await {
                Ok(config) if config.id == app_id => return Ok(config),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Ignoring invalid app config");
                }
            }
        }

        Err(AppConfigError::NotFound {
            app_id: app_id.to_string(),
        })
    }

    /// Parse and validate one config file.
    ///
    /// # Errors
    ///
    /// Returns [`AppConfigError::Io`] if the file cannot be read,
    /// [`AppConfigError::Parse`] for invalid YAML, and
    /// [`AppConfigError::MissingField`] if `id`, `name`, `primary_service` or
    /// `expected_services` is absent or empty, and
    /// [`AppConfigError::InvalidField`] if a service entry is blank.
    pub async fn load(path: &Path) -> Result<AppConfig, AppConfigError> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppConfigError::Io {
                path: display.clone(),
                message: e.to_string(),
            })?;

        let raw: RawAppConfig =
            serde_yaml::from_str(&content).map_err(|e| AppConfigError::Parse {
                path: display.clone(),
                message: e.to_string(),
            })?;

        let missing = |field: &str| AppConfigError::MissingField {
            path: display.clone(),
            field: field.to_string(),
        };

        let id = non_empty(raw.id).ok_or_else(|| missing("id"))?;
        let name = non_empty(raw.name).ok_or_else(|| missing("name"))?;
        let primary_service =
            non_empty(raw.primary_service).ok_or_else(|| missing("primary_service"))?;

        let expected_services: Vec<String> = raw
            .expected_services
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        if expected_services.is_empty() {
            return Err(missing("expected_services"));
        }
        if let Some(index) = expected_services.iter().position(String::is_empty) {
            return Err(AppConfigError::InvalidField {
                path: display,
                field: "expected_services".to_string(),
                message: format!("entry {index} is blank"),
            });
        }

        Ok(AppConfig {
            id,
            name,
            primary_service,
            uptime_monitor_ref: raw.uptime_monitor_ref.and_then(monitor_ref),
            expected_services,
            needs_bootstrap: raw.needs_bootstrap.unwrap_or(false),
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }

    /// Persist `needs_bootstrap: false` for `config`.
    ///
    /// A plain top-level `needs_bootstrap:` line is edited in place so
    /// comments and formatting survive. Any other spelling of the key (quoted,
    /// flow mapping) falls back to re-serializing the parsed mapping. The
    /// result is re-parsed before it is written.
    ///
    /// Callers writing the same file concurrently must serialize through a
    /// [`crate::bootstrap::FileLocks`] guard.
    ///
    /// # Errors
    ///
    /// Returns [`AppConfigError::Io`] if the file cannot be read or written,
    /// [`AppConfigError::Parse`] if the file does not parse, and
    /// [`AppConfigError::FlagNotCleared`] if no rewrite clears the flag.
    pub async fn clear_bootstrap_flag(&self, config: &AppConfig) -> Result<(), AppConfigError> {
        let path = config.config_path();
        let display = path.display().to_string();
        let io_err = |e: std::io::Error| AppConfigError::Io {
            path: display.clone(),
            message: e.to_string(),
        };
        let parse_err = |e: serde_yaml::Error| AppConfigError::Parse {
            path: display.clone(),
            message: e.to_string(),
        };

        let content = tokio::fs::read_to_string(&path).await.map_err(io_err)?;
        if !bootstrap_flag(&content).map_err(parse_err)? {
            return Ok(());
        }

        let updated = match clear_flag_line(&content) {
            Some(edited) if matches!(bootstrap_flag(&edited), Ok(false)) => edited,
            _ => clear_flag_in_mapping(&content).map_err(parse_err)?,
        };
        if bootstrap_flag(&updated).map_err(parse_err)? {
            return Err(AppConfigError::FlagNotCleared { path: display });
        }

        tokio::fs::write(&path, updated).await.map_err(io_err)?;
        tracing::info!(app_id = %config.id, "Cleared bootstrap flag");
        Ok(())
    }

    async fn candidate_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "Cannot read apps root");
                return files;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if !is_dir {
                continue;
            }
            let candidate = entry.path().join(APP_CONFIG_FILE);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                files.push(candidate);
            }
        }

        files.sort();
        files
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Monitor refs are often numeric ids in YAML; accept both forms.
fn monitor_ref(value: serde_yaml::Value) -> Option<String> {
    let text = match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    non_empty(Some(text))
}

/// Value of `needs_bootstrap` as the loader sees it.
fn bootstrap_flag(content: &str) -> Result<bool, serde_yaml::Error> {
    let raw: RawAppConfig = serde_yaml::from_str(content)?;
    Ok(raw.needs_bootstrap.unwrap_or(false))
}

/// Set the flag on the parsed document and serialize it back.
fn clear_flag_in_mapping(content: &str) -> Result<String, serde_yaml::Error> {
    let mut document: serde_yaml::Value = serde_yaml::from_str(content)?;
    if let serde_yaml::Value::Mapping(mapping) = &mut document {
        mapping.insert(
            serde_yaml::Value::String("needs_bootstrap".to_string()),
            serde_yaml::Value::Bool(false),
        );
    }
    serde_yaml::to_string(&document)
}

/// Rewrite the top-level `needs_bootstrap` line; `None` if nothing changes.
fn clear_flag_line(content: &str) -> Option<String> {
    let mut changed = false;
    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            let is_flag = line.starts_with("needs_bootstrap:");
            if is_flag && line.trim_end() != "needs_bootstrap: false" {
                changed = true;
                "needs_bootstrap: false".to_string()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !changed {
        return None;
    }

    let mut updated = lines.join("\n");
    if content.ends_with('\n') {
        updated.push('\n');
    }
    Some(updated)
}
