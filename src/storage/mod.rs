//! Storage backend.
//!
//! This module provides the append-only audit trail the orchestrator writes
//! its observations and actions to.
//!
//! # Architecture
//!
//! The storage layer uses `SQLite` with the `sqlx` crate for async operations.
//! The implementation is split across submodules:
//! - `core`: Pool management, migrations, and helper functions
//! - `messages`: Message operations and the [`crate::traits::AuditStore`] implementation
//! - `types`: Message types
//!
//! # Example
//!
//! ```ignore
//! use appstore_orchestrator::storage::{NewMessage, SenderType, SqliteStorage};
//!
//! let storage = SqliteStorage::new("./data/appstore.db").await?;
//! storage.insert_message(NewMessage::new("nextcloud", Utc::now(), "ok", SenderType::Agent)).await?;
//! ```

mod core;
mod messages;
mod types;

pub use self::core::SqliteStorage;
pub use types::{NewMessage, SenderType, StatusLevel, StoredMessage};
