//! Audit message types.
//!
//! - [`NewMessage`]: A message about to be appended
//! - [`StoredMessage`]: A message read back from the store
//! - [`SenderType`]: Who produced the message
//! - [`StatusLevel`]: Severity attached to a message

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Originator of an audit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    /// Written on behalf of the reasoning service or the fallback analysis.
    Agent,
    /// Written by the orchestrator itself (bootstrap progress, action outcomes).
    System,
}

impl SenderType {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::System => "system",
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(Self::Agent),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Severity of an audit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
    /// The app is down or degraded.
    Critical,
}

impl StatusLevel {
    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Parse from the stored string representation.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A message to append to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// App the message is attributed to.
    pub app_id: String,
    /// When the observation or action happened.
    pub timestamp: DateTime<Utc>,
    /// Human-readable text.
    pub message: String,
    /// Originator.
    pub sender_type: SenderType,
    /// Optional severity.
    pub status_level: Option<StatusLevel>,
    /// Optional JSON detail blob.
    pub details: Option<String>,
}

impl NewMessage {
    /// Create a message without severity or details.
    #[must_use]
    pub fn new(
        app_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        sender_type: SenderType,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            timestamp,
            message: message.into(),
            sender_type,
            status_level: None,
            details: None,
        }
    }

    /// Set the severity.
    #[must_use]
    pub const fn with_status_level(mut self, level: StatusLevel) -> Self {
        self.status_level = Some(level);
        self
    }

    /// Attach a JSON detail blob.
    #[must_use]
    pub fn with_details(mut self, details: &serde_json::Value) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// A message read back from the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique message identifier.
    pub id: String,
    /// App the message is attributed to.
    pub app_id: String,
    /// When the observation or action happened.
    pub timestamp: DateTime<Utc>,
    /// Human-readable text.
    pub message: String,
    /// Originator.
    pub sender_type: SenderType,
    /// Optional severity.
    pub status_level: Option<StatusLevel>,
    /// Optional JSON detail blob.
    pub details: Option<String>,
}

impl StoredMessage {
    /// Assign `id` to a new message.
    #[must_use]
    pub fn from_new(id: impl Into<String>, message: NewMessage) -> Self {
        Self {
            id: id.into(),
            app_id: message.app_id,
            timestamp: message.timestamp,
            message: message.message,
            sender_type: message.sender_type,
            status_level: message.status_level,
            details: message.details,
        }
    }
}
