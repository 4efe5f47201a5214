//! SQLite implementations of the store ports
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                        |
//! |-----------------|----------|-------------------------------------------------|
//! | UserIdentity    | TEXT     | `.as_str()` / `UserIdentity::new()`             |
//! | Nonce           | TEXT     | `.as_str()` / `Nonce::new()`                    |
//! | DateTime<Utc>   | TEXT     | RFC 3339, microseconds, `Z` suffix              |
//! | Option<String>  | TEXT     | NULL when absent                                |

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use chatdrive_core::domain::{Credential, CsrfState, Nonce, UserIdentity};
use chatdrive_core::ports::{ICredentialStore, ICsrfStateStore};

use crate::StoreError;

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Fixed-width UTC timestamp, so string comparison in SQL is chronological
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn credential_from_row(row: &SqliteRow) -> Result<Credential, StoreError> {
    let access_token: String = row.get("access_token");
    let refresh_token: Option<String> = row.get("refresh_token");
    let token_type: String = row.get("token_type");
    let expires_at: Option<String> = row.get("expires_at");

    Ok(Credential {
        access_token,
        refresh_token,
        expiry: parse_optional_datetime(expires_at)?,
        token_type,
    })
}

fn csrf_state_from_row(row: &SqliteRow) -> Result<CsrfState, StoreError> {
    let nonce_str: String = row.get("nonce");
    let user_str: String = row.get("user_id");
    let created_at_str: String = row.get("created_at");

    let nonce = Nonce::new(nonce_str).map_err(|e| StoreError::CorruptRecord(e.to_string()))?;
    let owner = UserIdentity::new(user_str.clone()).map_err(|e| {
        StoreError::CorruptRecord(format!("Invalid user id '{}': {}", user_str, e))
    })?;

    Ok(CsrfState {
        nonce,
        owner,
        created_at: parse_datetime(&created_at_str)?,
    })
}

// ============================================================================
// Credential store
// ============================================================================

/// Credentials table, one row per user
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ICredentialStore for SqliteCredentialStore {
    async fn get(&self, user: &UserIdentity) -> anyhow::Result<Option<Credential>> {
        let row = sqlx::query("SELECT * FROM user_credentials WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(credential_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, user: &UserIdentity, credential: &Credential) -> anyhow::Result<()> {
        let expires_at = credential.expiry.as_ref().map(format_datetime);
        let updated_at = format_datetime(&Utc::now());

        sqlx::query(
            "INSERT INTO user_credentials \
             (user_id, access_token, refresh_token, token_type, expires_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
             access_token = excluded.access_token, \
             refresh_token = excluded.refresh_token, \
             token_type = excluded.token_type, \
             expires_at = excluded.expires_at, \
             updated_at = excluded.updated_at",
        )
        .bind(user.as_str())
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(&credential.token_type)
        .bind(&expires_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        tracing::trace!(user = %user, "Saved credential");
        Ok(())
    }

    async fn delete(&self, user: &UserIdentity) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM user_credentials WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        tracing::trace!(user = %user, rows = result.rows_affected(), "Deleted credential");
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// CSRF state store
// ============================================================================

/// Pending authorization states keyed by nonce
pub struct SqliteCsrfStateStore {
    pool: SqlitePool,
}

impl SqliteCsrfStateStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ICsrfStateStore for SqliteCsrfStateStore {
    async fn put(&self, state: &CsrfState) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO oauth_states (nonce, user_id, created_at) VALUES (?, ?, ?)")
            .bind(state.nonce.as_str())
            .bind(state.owner.as_str())
            .bind(format_datetime(&state.created_at))
            .execute(&self.pool)
            .await?;

        tracing::trace!(user = %state.owner, "Saved authorization state");
        Ok(())
    }

    async fn consume(&self, nonce: &Nonce) -> anyhow::Result<Option<CsrfState>> {
        // Single statement, so two callbacks racing on one nonce cannot both win
        let row = sqlx::query(
            "DELETE FROM oauth_states WHERE nonce = ? RETURNING nonce, user_id, created_at",
        )
        .bind(nonce.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(csrf_state_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM oauth_states WHERE created_at < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
