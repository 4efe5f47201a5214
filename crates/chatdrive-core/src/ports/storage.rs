//! Remote storage ports (driven/secondary ports)
//!
//! A [`IStorageSessionFactory`] turns a stored [`Credential`] into an
//! authenticated [`IStorageSession`]. Token refresh, if any, happens inside
//! the factory and is invisible to the core.

use crate::domain::{Credential, FolderId, MediaContent, ProviderError, RemoteFile, UploadResult};

/// Authenticated session against one user's storage account
#[async_trait::async_trait]
pub trait IStorageSession: Send + Sync {
    /// Looks up a non-trashed folder named `name` directly under `parent`
    async fn find_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> Result<Option<FolderId>, ProviderError>;

    /// Creates a folder named `name` under `parent`
    async fn create_folder(&self, name: &str, parent: &FolderId)
        -> Result<FolderId, ProviderError>;

    /// Creates a file under `parent`, streaming `content` as its body
    async fn create_file(
        &self,
        name: &str,
        parent: &FolderId,
        content: MediaContent,
    ) -> Result<UploadResult, ProviderError>;

    /// Child folders of `parent`, newest name first, at most `limit`
    async fn list_folders(
        &self,
        parent: &FolderId,
        limit: u32,
    ) -> Result<Vec<FolderId>, ProviderError>;

    /// Non-folder files under any of `parents`, newest first, at most `limit`
    async fn list_recent_files(
        &self,
        parents: &[FolderId],
        limit: u32,
    ) -> Result<Vec<RemoteFile>, ProviderError>;

    /// The credential after a refresh performed while opening the session
    ///
    /// Callers persist it so the next session starts from the new token.
    fn refreshed_credential(&self) -> Option<&Credential> {
        None
    }
}

/// Builds authenticated storage sessions
#[async_trait::async_trait]
pub trait IStorageSessionFactory: Send + Sync {
    /// Opens a session for `credential`
    async fn new_session(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn IStorageSession>, ProviderError>;
}
