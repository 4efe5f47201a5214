//! Credential and CSRF state store ports (driven/secondary ports)
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, in-memory) and don't need domain-level classification.
//! - "Not found" is not an error: lookups return `Option` and deletes
//!   report whether a record existed.
//! - Neither store enforces staleness. CSRF single-use comes from
//!   [`ICsrfStateStore::consume`] being an atomic read-and-delete.

use chrono::{DateTime, Utc};

use crate::domain::{Credential, CsrfState, Nonce, UserIdentity};

/// Persists one credential per user identity
#[async_trait::async_trait]
pub trait ICredentialStore: Send + Sync {
    /// Returns the credential for `user`, or `None` if there is none
    async fn get(&self, user: &UserIdentity) -> anyhow::Result<Option<Credential>>;

    /// Stores `credential` for `user`, replacing any previous one
    async fn put(&self, user: &UserIdentity, credential: &Credential) -> anyhow::Result<()>;

    /// Deletes the credential for `user`
    ///
    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, user: &UserIdentity) -> anyhow::Result<bool>;
}

/// Persists short-lived, single-use authorization handshake records
#[async_trait::async_trait]
pub trait ICsrfStateStore: Send + Sync {
    /// Stores a new state record
    async fn put(&self, state: &CsrfState) -> anyhow::Result<()>;

    /// Atomically reads and deletes the record for `nonce`
    ///
    /// A second call with the same nonce returns `None`.
    async fn consume(&self, nonce: &Nonce) -> anyhow::Result<Option<CsrfState>>;

    /// Deletes records created before `cutoff`, returning how many went
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}
