//! Upload orchestration use case
//!
//! Opens an authenticated storage session for a user, places media under
//! `<root>/<YYYY-MM>`, and answers recent-file queries over the same tree.
//!
//! ## Flow
//!
//! ```text
//! open_session(user) ──► resolve_folder([root, month]) ──► create_file(stream)
//! ```

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    ConnectionError, FolderId, FolderPath, MediaContent, ProviderError, RemoteFile, UploadResult,
    UserIdentity,
};
use crate::ports::{ICredentialStore, IStorageSession, IStorageSessionFactory};
use crate::usecases::provision::{find_folder_path, resolve_folder};

/// Default cap on the recent-files listing
pub const DEFAULT_RECENT_FILES_LIMIT: u32 = 5;

/// Month folders scanned by the recent-files listing
const RECENT_MONTHS_SCANNED: u32 = 24;

/// Places media into a user's storage account
pub struct UploadOrchestrator {
    credentials: Arc<dyn ICredentialStore>,
    sessions: Arc<dyn IStorageSessionFactory>,
    root_folder_name: String,
    utc_offset: FixedOffset,
    recent_limit: u32,
}

impl UploadOrchestrator {
    /// Creates a new UploadOrchestrator
    ///
    /// # Arguments
    ///
    /// * `credentials` - Store the session credential is read from
    /// * `sessions` - Factory for authenticated storage sessions
    /// * `root_folder_name` - Top-level folder every upload lands under
    pub fn new(
        credentials: Arc<dyn ICredentialStore>,
        sessions: Arc<dyn IStorageSessionFactory>,
        root_folder_name: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            sessions,
            root_folder_name: root_folder_name.into(),
            utc_offset: Utc.fix(),
            recent_limit: DEFAULT_RECENT_FILES_LIMIT,
        }
    }

    /// Sets the offset used to pick the month folder
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Sets how many files the recent-files listing returns
    #[must_use]
    pub fn with_recent_limit(mut self, limit: u32) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Opens a storage session for `user`
    ///
    /// A credential refreshed while opening the session is written back to
    /// the store; failing to do so is logged only.
    ///
    /// # Errors
    /// - [`ConnectionError::NotFound`] if the user never connected. No
    ///   remote call is made in that case.
    /// - [`ConnectionError::Persistence`] if the store could not be read
    /// - [`ConnectionError::SessionFailed`] if the factory failed
    pub async fn open_session(
        &self,
        user: &UserIdentity,
    ) -> Result<Box<dyn IStorageSession>, ConnectionError> {
        let credential = self
            .credentials
            .get(user)
            .await
            .map_err(ConnectionError::Persistence)?
            .ok_or(ConnectionError::NotFound)?;

        let session = self
            .sessions
            .new_session(&credential)
            .await
            .map_err(ConnectionError::SessionFailed)?;

        if let Some(refreshed) = session.refreshed_credential() {
            match self.credentials.put(user, refreshed).await {
                Ok(()) => debug!(user = %user, "Stored refreshed credential"),
                Err(e) => warn!(
                    user = %user,
                    error = format!("{e:#}"),
                    "Failed to store refreshed credential"
                ),
            }
        }

        Ok(session)
    }

    /// The dated folder an upload made at `at` lands in
    ///
    /// # Errors
    /// [`ConnectionError::ProvisionFailed`] if the root folder name is blank
    pub fn monthly_path(&self, at: DateTime<Utc>) -> Result<FolderPath, ConnectionError> {
        FolderPath::monthly(&self.root_folder_name, &at.with_timezone(&self.utc_offset))
            .map_err(|e| ConnectionError::ProvisionFailed(ProviderError::Other(e.to_string())))
    }

    /// Uploads `content` as `filename` into this month's folder
    ///
    /// # Errors
    /// [`ConnectionError::ProvisionFailed`] or [`ConnectionError::UploadFailed`]
    pub async fn upload(
        &self,
        session: &dyn IStorageSession,
        content: MediaContent,
        filename: &str,
    ) -> Result<UploadResult, ConnectionError> {
        let path = self.monthly_path(Utc::now())?;
        self.upload_into(session, &path, content, filename).await
    }

    /// Uploads `content` as `filename` into `path`
    ///
    /// # Errors
    /// [`ConnectionError::ProvisionFailed`] or [`ConnectionError::UploadFailed`]
    pub async fn upload_into(
        &self,
        session: &dyn IStorageSession,
        path: &FolderPath,
        content: MediaContent,
        filename: &str,
    ) -> Result<UploadResult, ConnectionError> {
        let folder = resolve_folder(session, path).await?;

        let result = session
            .create_file(filename, &folder, content)
            .await
            .map_err(ConnectionError::UploadFailed)?;

        info!(
            file = %filename,
            path = %path,
            remote_id = %result.remote_file_id,
            "Uploaded file"
        );
        Ok(result)
    }

    /// Most recently created files under the root folder, newest first
    ///
    /// Never creates folders. A user who has not uploaded anything yet gets
    /// an empty list.
    ///
    /// # Errors
    /// - Any error of [`Self::open_session`]
    /// - [`ConnectionError::QueryFailed`] if a listing call failed
    pub async fn recent_files(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<RemoteFile>, ConnectionError> {
        let session = self.open_session(user).await?;
        self.recent_files_in(session.as_ref()).await
    }

    /// Same as [`Self::recent_files`] over an already open session
    ///
    /// # Errors
    /// [`ConnectionError::QueryFailed`] if a listing call failed
    pub async fn recent_files_in(
        &self,
        session: &dyn IStorageSession,
    ) -> Result<Vec<RemoteFile>, ConnectionError> {
        let root_path = FolderPath::new([self.root_folder_name.as_str()])
            .map_err(|e| ConnectionError::QueryFailed(ProviderError::Other(e.to_string())))?;

        let Some(root) = find_folder_path(session, &root_path).await? else {
            debug!(root = %root_path, "Root folder does not exist yet");
            return Ok(Vec::new());
        };

        let months = session
            .list_folders(&root, RECENT_MONTHS_SCANNED)
            .await
            .map_err(ConnectionError::QueryFailed)?;

        let mut parents: Vec<FolderId> = Vec::with_capacity(months.len() + 1);
        parents.push(root);
        parents.extend(months);

        session
            .list_recent_files(&parents, self.recent_limit)
            .await
            .map_err(ConnectionError::QueryFailed)
    }
}
