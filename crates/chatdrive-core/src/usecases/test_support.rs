//! In-memory port implementations shared by the use case tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ConnectionState, Credential, CsrfState, FolderId, MediaContent, Nonce, ProviderError,
    RemoteFile, UploadResult, UserIdentity,
};
use crate::ports::{
    IChatMessenger, ICredentialStore, ICsrfStateStore, IIdentityProvider, IMessageContentSource,
    IStorageSession, IStorageSessionFactory, OutgoingMessage,
};
use crate::usecases::hooks::IConnectionHook;

pub fn user(id: &str) -> UserIdentity {
    UserIdentity::new(id).unwrap()
}

// ============================================================================
// Stores
// ============================================================================

#[derive(Default)]
pub struct MockCredentialStore {
    pub records: Mutex<HashMap<UserIdentity, Credential>>,
    pub fail_get: Mutex<bool>,
    pub fail_put: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
}

impl MockCredentialStore {
    pub fn with(user: &UserIdentity, credential: Credential) -> Self {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap()
            .insert(user.clone(), credential);
        store
    }

    pub fn stored(&self, user: &UserIdentity) -> Option<Credential> {
        self.records.lock().unwrap().get(user).cloned()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl ICredentialStore for MockCredentialStore {
    async fn get(&self, user: &UserIdentity) -> anyhow::Result<Option<Credential>> {
        if *self.fail_get.lock().unwrap() {
            anyhow::bail!("credential store unavailable");
        }
        Ok(self.stored(user))
    }

    async fn put(&self, user: &UserIdentity, credential: &Credential) -> anyhow::Result<()> {
        if *self.fail_put.lock().unwrap() {
            anyhow::bail!("credential store is read-only");
        }
        self.records
            .lock()
            .unwrap()
            .insert(user.clone(), credential.clone());
        Ok(())
    }

    async fn delete(&self, user: &UserIdentity) -> anyhow::Result<bool> {
        if *self.fail_delete.lock().unwrap() {
            anyhow::bail!("credential store is read-only");
        }
        Ok(self.records.lock().unwrap().remove(user).is_some())
    }
}

#[derive(Default)]
pub struct MockStateStore {
    pub records: Mutex<HashMap<String, CsrfState>>,
    pub fail_put: Mutex<bool>,
}

impl MockStateStore {
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn insert(&self, state: CsrfState) {
        self.records
            .lock()
            .unwrap()
            .insert(state.nonce.as_str().to_string(), state);
    }

    pub fn only_nonce(&self) -> Nonce {
        let records = self.records.lock().unwrap();
        assert_eq!(records.len(), 1, "expected exactly one stored state");
        records.values().next().unwrap().nonce.clone()
    }
}

#[async_trait]
impl ICsrfStateStore for MockStateStore {
    async fn put(&self, state: &CsrfState) -> anyhow::Result<()> {
        if *self.fail_put.lock().unwrap() {
            anyhow::bail!("state store unavailable");
        }
        self.insert(state.clone());
        Ok(())
    }

    async fn consume(&self, nonce: &Nonce) -> anyhow::Result<Option<CsrfState>> {
        Ok(self.records.lock().unwrap().remove(nonce.as_str()))
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, s| s.created_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}

// ============================================================================
// Identity provider
// ============================================================================

#[derive(Default)]
pub struct MockIdentityProvider {
    pub exchange_error: Mutex<Option<ProviderError>>,
    pub revoke_error: Mutex<Option<ProviderError>>,
    pub exchanged_codes: Mutex<Vec<String>>,
    pub revoked_tokens: Mutex<Vec<String>>,
}

impl MockIdentityProvider {
    pub fn exchange_count(&self) -> usize {
        self.exchanged_codes.lock().unwrap().len()
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked_tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl IIdentityProvider for MockIdentityProvider {
    fn authorization_url(&self, nonce: &Nonce) -> String {
        format!(
            "https://accounts.example.com/auth?state={}&access_type=offline",
            nonce
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError> {
        self.exchanged_codes.lock().unwrap().push(code.to_string());
        if let Some(err) = self.exchange_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Credential::bearer(format!("access-{code}")).with_refresh_token(format!("refresh-{code}")))
    }

    async fn revoke(&self, token: &str) -> Result<(), ProviderError> {
        self.revoked_tokens.lock().unwrap().push(token.to_string());
        match self.revoke_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Folder tree plus failure switches and call counters
#[derive(Default)]
pub struct MockDrive {
    /// (id, name, parent)
    pub folders: Mutex<Vec<(String, String, String)>>,
    pub files: Mutex<Vec<(RemoteFile, String)>>,
    pub find_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub find_error: Mutex<Option<ProviderError>>,
    pub create_error: Mutex<Option<ProviderError>>,
    pub upload_error: Mutex<Option<ProviderError>>,
    pub list_error: Mutex<Option<ProviderError>>,
    pub session_error: Mutex<Option<ProviderError>>,
    pub refreshed: Mutex<Option<Credential>>,
    pub sessions_opened: AtomicUsize,
    pub uploaded_bytes: Mutex<Vec<u8>>,
}

impl MockDrive {
    pub fn add_folder(&self, id: &str, name: &str, parent: &str) {
        self.folders
            .lock()
            .unwrap()
            .push((id.to_string(), name.to_string(), parent.to_string()));
    }

    pub fn add_file(&self, id: &str, name: &str, parent: &str) {
        self.files.lock().unwrap().push((
            RemoteFile {
                id: id.to_string(),
                name: name.to_string(),
                view_url: format!("https://drive.example.com/file/d/{id}/view"),
                created_at: Some(Utc::now()),
            },
            parent.to_string(),
        ));
    }

    pub fn finds(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn folder_count(&self, name: &str) -> usize {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n, _)| n == name)
            .count()
    }
}

pub struct MockSession {
    drive: Arc<MockDrive>,
    refreshed: Option<Credential>,
}

#[async_trait]
impl IStorageSession for MockSession {
    async fn find_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> Result<Option<FolderId>, ProviderError> {
        self.drive.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.drive.find_error.lock().unwrap().clone() {
            return Err(err);
        }
        let folders = self.drive.folders.lock().unwrap();
        Ok(folders
            .iter()
            .find(|(_, n, p)| n == name && p == parent.as_str())
            .map(|(id, _, _)| FolderId::new(id.clone()).unwrap()))
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> Result<FolderId, ProviderError> {
        let n = self.drive.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.drive.create_error.lock().unwrap().clone() {
            return Err(err);
        }
        let id = format!("folder-{}", n + 1);
        self.drive.add_folder(&id, name, parent.as_str());
        Ok(FolderId::new(id).unwrap())
    }

    async fn create_file(
        &self,
        name: &str,
        parent: &FolderId,
        mut content: MediaContent,
    ) -> Result<UploadResult, ProviderError> {
        use futures_util::StreamExt;

        let n = self.drive.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.drive.upload_error.lock().unwrap().clone() {
            return Err(err);
        }
        while let Some(chunk) = content.stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;
            self.drive
                .uploaded_bytes
                .lock()
                .unwrap()
                .extend_from_slice(&chunk);
        }
        let id = format!("file-{}", n + 1);
        self.drive.add_file(&id, name, parent.as_str());
        Ok(UploadResult {
            view_url: format!("https://drive.example.com/file/d/{id}/view"),
            remote_file_id: id,
        })
    }

    async fn list_folders(
        &self,
        parent: &FolderId,
        limit: u32,
    ) -> Result<Vec<FolderId>, ProviderError> {
        if let Some(err) = self.drive.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut folders: Vec<(String, String)> = self
            .drive
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, p)| p == parent.as_str())
            .map(|(id, name, _)| (name.clone(), id.clone()))
            .collect();
        folders.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(folders
            .into_iter()
            .take(limit as usize)
            .map(|(_, id)| FolderId::new(id).unwrap())
            .collect())
    }

    async fn list_recent_files(
        &self,
        parents: &[FolderId],
        limit: u32,
    ) -> Result<Vec<RemoteFile>, ProviderError> {
        if let Some(err) = self.drive.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        let files = self.drive.files.lock().unwrap();
        Ok(files
            .iter()
            .rev()
            .filter(|(_, p)| parents.iter().any(|parent| parent.as_str() == p))
            .take(limit as usize)
            .map(|(f, _)| f.clone())
            .collect())
    }

    fn refreshed_credential(&self) -> Option<&Credential> {
        self.refreshed.as_ref()
    }
}

pub struct MockSessionFactory {
    pub drive: Arc<MockDrive>,
}

impl MockSessionFactory {
    pub fn new(drive: Arc<MockDrive>) -> Self {
        Self { drive }
    }
}

#[async_trait]
impl IStorageSessionFactory for MockSessionFactory {
    async fn new_session(
        &self,
        _credential: &Credential,
    ) -> Result<Box<dyn IStorageSession>, ProviderError> {
        self.drive.sessions_opened.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.drive.session_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(Box::new(MockSession {
            drive: Arc::clone(&self.drive),
            refreshed: self.drive.refreshed.lock().unwrap().clone(),
        }))
    }
}

// ============================================================================
// Chat platform
// ============================================================================

#[derive(Default)]
pub struct MockMessenger {
    pub replies: Mutex<Vec<(String, Vec<OutgoingMessage>)>>,
    pub links: Mutex<Vec<(UserIdentity, String)>>,
    pub fail_link: Mutex<bool>,
    pub fail_reply: Mutex<bool>,
}

impl MockMessenger {
    pub fn replies(&self) -> Vec<(String, Vec<OutgoingMessage>)> {
        self.replies.lock().unwrap().clone()
    }

    /// Messages of the only reply sent so far
    pub fn only_reply(&self) -> Vec<OutgoingMessage> {
        let replies = self.replies.lock().unwrap();
        assert_eq!(replies.len(), 1, "expected exactly one reply: {replies:?}");
        replies[0].1.clone()
    }

    /// Text of the first message of the only reply
    pub fn only_reply_text(&self) -> String {
        match self.only_reply().into_iter().next() {
            Some(OutgoingMessage::Text { text, .. }) => text,
            other => panic!("expected a text reply, got {other:?}"),
        }
    }

    pub fn links(&self) -> Vec<(UserIdentity, String)> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl IChatMessenger for MockMessenger {
    async fn reply(&self, reply_token: &str, messages: &[OutgoingMessage]) -> anyhow::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages.to_vec()));
        if *self.fail_reply.lock().unwrap() {
            anyhow::bail!("reply token expired");
        }
        Ok(())
    }

    async fn link_ui_state(&self, user: &UserIdentity, affordance_id: &str) -> anyhow::Result<()> {
        if *self.fail_link.lock().unwrap() {
            anyhow::bail!("rich menu not found");
        }
        self.links
            .lock()
            .unwrap()
            .push((user.clone(), affordance_id.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockContentSource {
    pub fetched: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

impl MockContentSource {
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl IMessageContentSource for MockContentSource {
    async fn fetch_content(&self, message_id: &str) -> anyhow::Result<MediaContent> {
        self.fetched.lock().unwrap().push(message_id.to_string());
        if *self.fail.lock().unwrap() {
            anyhow::bail!("content expired");
        }
        Ok(MediaContent::from_bytes(format!("content-of-{message_id}").into_bytes()))
    }
}

// ============================================================================
// Hooks
// ============================================================================

#[derive(Default)]
pub struct RecordingHook {
    pub seen: Mutex<Vec<(UserIdentity, ConnectionState)>>,
    pub fail: bool,
}

impl RecordingHook {
    pub fn failing() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn seen(&self) -> Vec<(UserIdentity, ConnectionState)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl IConnectionHook for RecordingHook {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_transition(
        &self,
        user: &UserIdentity,
        state: ConnectionState,
    ) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push((user.clone(), state));
        if self.fail {
            anyhow::bail!("hook failed");
        }
        Ok(())
    }
}
