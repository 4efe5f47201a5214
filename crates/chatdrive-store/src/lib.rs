//! ChatDrive Store - Authorization state persistence
//!
//! Backends for the two stores the connection lifecycle depends on:
//! - Per-user OAuth credentials ([`ICredentialStore`])
//! - Single-use CSRF states ([`ICsrfStateStore`])
//!
//! ## Architecture
//!
//! This crate implements the store ports from `chatdrive-core`. It is a
//! driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - SQLite pool sized for single-row access, with a
//!   version check and schema bootstrap
//! - [`SqliteCredentialStore`] / [`SqliteCsrfStateStore`] - Durable stores
//! - [`MemoryCredentialStore`] / [`MemoryCsrfStateStore`] - Process-local
//!   stores for development and tests
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use chatdrive_store::{DatabasePool, SqliteCredentialStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/chatdrive/chatdrive.db")).await?;
//! let credentials = SqliteCredentialStore::new(pool.pool().clone());
//! // Use credentials as ICredentialStore...
//! # Ok(())
//! # }
//! ```
//!
//! [`ICredentialStore`]: chatdrive_core::ports::ICredentialStore
//! [`ICsrfStateStore`]: chatdrive_core::ports::ICsrfStateStore

pub mod memory;
pub mod pool;
pub mod sqlite;

pub use memory::{MemoryCredentialStore, MemoryCsrfStateStore};
pub use pool::DatabasePool;
pub use sqlite::{SqliteCredentialStore, SqliteCsrfStateStore};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The linked SQLite library lacks a required feature
    #[error("Unsupported database: {0}")]
    Unsupported(String),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
