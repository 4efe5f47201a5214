//! In-memory store backends
//!
//! Lost on restart. Used when `storage.backend` is `memory` and by tests
//! of the crates above this one.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use chatdrive_core::domain::{Credential, CsrfState, Nonce, UserIdentity};
use chatdrive_core::ports::{ICredentialStore, ICsrfStateStore};

/// Credentials held in a concurrent map
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: DashMap<UserIdentity, Credential>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl ICredentialStore for MemoryCredentialStore {
    async fn get(&self, user: &UserIdentity) -> anyhow::Result<Option<Credential>> {
        Ok(self.records.get(user).map(|entry| entry.value().clone()))
    }

    async fn put(&self, user: &UserIdentity, credential: &Credential) -> anyhow::Result<()> {
        self.records.insert(user.clone(), credential.clone());
        Ok(())
    }

    async fn delete(&self, user: &UserIdentity) -> anyhow::Result<bool> {
        Ok(self.records.remove(user).is_some())
    }
}

/// CSRF states held in a concurrent map
#[derive(Default)]
pub struct MemoryCsrfStateStore {
    records: DashMap<Nonce, CsrfState>,
}

impl MemoryCsrfStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending states
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl ICsrfStateStore for MemoryCsrfStateStore {
    async fn put(&self, state: &CsrfState) -> anyhow::Result<()> {
        self.records.insert(state.nonce.clone(), state.clone());
        Ok(())
    }

    async fn consume(&self, nonce: &Nonce) -> anyhow::Result<Option<CsrfState>> {
        Ok(self.records.remove(nonce).map(|(_, state)| state))
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let before = self.records.len();
        self.records.retain(|_, state| state.created_at >= cutoff);
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}
