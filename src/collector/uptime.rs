//! Uptime monitor status lookups.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;

use super::types::UptimeStatus;

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: serde_json::Value,
}

/// Client for `GET <base>/status/<monitor-ref>`.
///
/// Every failure degrades to [`UptimeStatus::Down`] with a warning; nothing
/// here is fatal to a cycle.
#[derive(Debug, Clone)]
pub struct UptimeMonitor {
    client: Client,
    base_url: Option<String>,
}

impl UptimeMonitor {
    /// Create a monitor client; `base_url` of `None` means no monitor is deployed.
    ///
    /// Falls back to a default client if the builder fails.
    #[must_use]
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Status for `monitor_ref`, or UP when the app has no monitor.
    pub async fn status(&self, monitor_ref: Option<&str>) -> UptimeStatus {
        let Some(monitor_ref) = monitor_ref else {
            return UptimeStatus::Up;
        };
        let Some(base_url) = &self.base_url else {
            tracing::warn!(monitor_ref, "Monitor configured for app but no uptime monitor URL set");
            return UptimeStatus::Down;
        };

        let Some(url) = status_url(base_url, monitor_ref) else {
            tracing::warn!(base_url = %base_url, "Uptime monitor URL is not a valid base URL");
            return UptimeStatus::Down;
        };
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Uptime monitor request failed");
                return UptimeStatus::Down;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "Uptime monitor returned error status");
            return UptimeStatus::Down;
        }

        match response.json::<StatusBody>().await {
            Ok(body) if is_up(&body.status) => UptimeStatus::Up,
            Ok(body) => {
                tracing::warn!(url = %url, status = %body.status, "Uptime monitor reports app down");
                UptimeStatus::Down
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Invalid uptime monitor response");
                UptimeStatus::Down
            }
        }
    }
}

/// `<base>/status/<monitor_ref>` with the ref escaped as one path segment.
fn status_url(base_url: &str, monitor_ref: &str) -> Option<Url> {
    let mut url = Url::parse(base_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["status", monitor_ref]);
    Some(url)
}

fn is_up(status: &serde_json::Value) -> bool {
    status
        .as_f64()
        .is_some_and(|value| (value - 1.0).abs() < f64::EPSILON)
}
