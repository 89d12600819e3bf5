//! Audit message operations and the [`AuditStore`] implementation.

#![allow(clippy::missing_errors_doc)]

use async_trait::async_trait;
use sqlx::Row;

use super::core::SqliteStorage;
use super::types::{NewMessage, SenderType, StatusLevel, StoredMessage};
use crate::error::StorageError;
use crate::traits::AuditStore;

impl SqliteStorage {
    /// Append a message to the audit trail.
    pub async fn insert_message(&self, message: NewMessage) -> Result<StoredMessage, StorageError> {
        let id = Self::generate_id();

        sqlx::query(
            "INSERT INTO messages (id, app_id, timestamp, message, sender_type, status_level, details) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&message.app_id)
        .bind(Self::format_datetime(&message.timestamp))
        .bind(&message.message)
        .bind(message.sender_type.as_str())
        .bind(message.status_level.map(|l| l.as_str()))
        .bind(&message.details)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::query_error("INSERT messages", format!("{e}")))?;

        Ok(StoredMessage::from_new(id, message))
    }

    /// Messages for one app, newest first. Ties keep reverse insertion order.
    pub async fn list_messages(
        &self,
        app_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, app_id, timestamp, message, sender_type, status_level, details \
             FROM messages WHERE app_id = ? ORDER BY timestamp DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(app_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Self::query_error("SELECT messages", format!("{e}")))?;

        rows.iter()
            .map(|row| {
                let timestamp_str: String = row.get("timestamp");
                let sender_str: String = row.get("sender_type");
                let level_str: Option<String> = row.get("status_level");

                let sender_type =
                    SenderType::from_str(&sender_str).ok_or_else(|| StorageError::Internal {
                        message: format!("Unknown sender type '{sender_str}'"),
                    })?;
                let status_level = match level_str {
                    Some(level) => Some(StatusLevel::from_str(&level).ok_or_else(|| {
                        StorageError::Internal {
                            message: format!("Unknown status level '{level}'"),
                        }
                    })?),
                    None => None,
                };

                Ok(StoredMessage {
                    id: row.get("id"),
                    app_id: row.get("app_id"),
                    timestamp: Self::parse_datetime(&timestamp_str)?,
                    message: row.get("message"),
                    sender_type,
                    status_level,
                    details: row.get("details"),
                })
            })
            .collect()
    }
}

#[async_trait]
impl AuditStore for SqliteStorage {
    async fn create_message(&self, message: NewMessage) -> Result<StoredMessage, StorageError> {
        self.insert_message(message).await
    }

    async fn get_messages(
        &self,
        app_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        self.list_messages(app_id, limit, offset).await
    }
}
