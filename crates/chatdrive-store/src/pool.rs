//! SQLite pool for the credential and authorization state tables
//!
//! Both stores issue one short statement per call: a webhook handler reads
//! or replaces a single credential row, the OAuth callback deletes a single
//! state row, and the sweeper runs one ranged delete every few minutes.
//! The pool is sized for that pattern rather than for bulk work.
//!
//! Opening a pool also checks the linked SQLite library, because the
//! single-use guarantee of [`ICsrfStateStore::consume`] rests on
//! `DELETE … RETURNING`, which needs SQLite 3.35 or newer.
//!
//! [`ICsrfStateStore::consume`]: chatdrive_core::ports::ICsrfStateStore::consume

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::StoreError;

/// Oldest SQLite release with `RETURNING` support
pub const MIN_SQLITE_VERSION: (u32, u32, u32) = (3, 35, 0);

/// Concurrent webhook deliveries sharing a file database
const MAX_FILE_CONNECTIONS: u32 = 4;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a request waits for a free connection
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections above the minimum are closed after this
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

const SCHEMA: &str = include_str!("migrations/20261018_initial.sql");

/// Open SQLite pool with the ChatDrive schema applied
pub struct DatabasePool {
    pool: SqlitePool,
    sqlite_version: String,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Missing parent directories are created. The file is put in WAL mode
    /// so credential reads are not blocked by the sweeper's deletes.
    ///
    /// # Errors
    ///
    /// - `StoreError::ConnectionFailed` if the file cannot be opened
    /// - `StoreError::Unsupported` if the SQLite library is too old
    /// - `StoreError::MigrationFailed` if the schema cannot be applied
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_FILE_CONNECTIONS)
            .min_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to open database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let opened = Self::prepare(pool).await?;
        info!(
            path = %db_path.display(),
            sqlite = %opened.sqlite_version,
            "Credential database ready"
        );
        Ok(opened)
    }

    /// Opens a private in-memory database
    ///
    /// An in-memory database lives inside its connection, so the pool holds
    /// exactly one connection and never lets it idle out.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to open in-memory database: {}", e))
            })?;

        let opened = Self::prepare(pool).await?;
        debug!(sqlite = %opened.sqlite_version, "In-memory database ready");
        Ok(opened)
    }

    /// The underlying pool, for constructing the stores
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Version string reported by the linked SQLite library
    pub fn sqlite_version(&self) -> &str {
        &self.sqlite_version
    }

    /// Closes every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn prepare(pool: SqlitePool) -> Result<Self, StoreError> {
        let sqlite_version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to query SQLite version: {}", e))
            })?;
        ensure_returning_supported(&sqlite_version)?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(|e| {
            StoreError::MigrationFailed(format!("Failed to apply schema: {}", e))
        })?;

        Ok(Self {
            pool,
            sqlite_version,
        })
    }
}

/// Parses `major.minor.patch` as printed by `sqlite_version()`
fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next()??;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}

fn ensure_returning_supported(version: &str) -> Result<(), StoreError> {
    match parse_version(version) {
        Some(found) if found >= MIN_SQLITE_VERSION => Ok(()),
        _ => {
            let (major, minor, patch) = MIN_SQLITE_VERSION;
            Err(StoreError::Unsupported(format!(
                "SQLite {} is too old; {}.{}.{} or newer is required for single-use states",
                version, major, minor, patch
            )))
        }
    }
}
