//! Storage session adapters backed by Google Drive
//!
//! [`DriveSessionFactory`] turns a stored credential into a [`DriveSession`],
//! refreshing the access token first when it is expired or about to expire.
//! The session then delegates each [`IStorageSession`] operation to the
//! [`crate::files`] and [`crate::upload`] modules.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use chatdrive_core::config::DriveConfig;
use chatdrive_core::domain::{
    Credential, FolderId, MediaContent, ProviderError, RemoteFile, UploadResult,
};
use chatdrive_core::ports::{IStorageSession, IStorageSessionFactory};

use crate::auth::GoogleIdentityProvider;
use crate::client::{DriveClient, DRIVE_BASE_URL, DRIVE_UPLOAD_BASE_URL};
use crate::{files, upload};

/// Tokens expiring within this window are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 60;

// ============================================================================
// DriveSession
// ============================================================================

/// Drive access for one user for the duration of one event
pub struct DriveSession {
    client: DriveClient,
    refreshed: Option<Credential>,
}

impl DriveSession {
    /// Creates a session over an already-authenticated client
    pub fn new(client: DriveClient) -> Self {
        Self {
            client,
            refreshed: None,
        }
    }

    /// Records that the session runs on a newly refreshed credential
    #[must_use]
    pub fn with_refreshed_credential(mut self, credential: Credential) -> Self {
        self.refreshed = Some(credential);
        self
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IStorageSession for DriveSession {
    async fn find_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> Result<Option<FolderId>, ProviderError> {
        Ok(files::find_folder(&self.client, name, parent).await?)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> Result<FolderId, ProviderError> {
        Ok(files::create_folder(&self.client, name, parent).await?)
    }

    async fn create_file(
        &self,
        name: &str,
        parent: &FolderId,
        content: MediaContent,
    ) -> Result<UploadResult, ProviderError> {
        Ok(upload::upload_file(&self.client, name, parent, content).await?)
    }

    async fn list_folders(
        &self,
        parent: &FolderId,
        limit: u32,
    ) -> Result<Vec<FolderId>, ProviderError> {
        Ok(files::list_folders(&self.client, parent, limit).await?)
    }

    async fn list_recent_files(
        &self,
        parents: &[FolderId],
        limit: u32,
    ) -> Result<Vec<RemoteFile>, ProviderError> {
        Ok(files::list_recent_files(&self.client, parents, limit).await?)
    }

    fn refreshed_credential(&self) -> Option<&Credential> {
        self.refreshed.as_ref()
    }
}

// ============================================================================
// DriveSessionFactory
// ============================================================================

/// Builds [`DriveSession`]s that share one connection pool
pub struct DriveSessionFactory {
    identity: Arc<GoogleIdentityProvider>,
    http_client: reqwest::Client,
    base_url: String,
    upload_base_url: String,
}

impl DriveSessionFactory {
    /// Creates a factory for the public Drive endpoints
    pub fn new(identity: Arc<GoogleIdentityProvider>) -> Self {
        Self::with_base_urls(identity, DRIVE_BASE_URL, DRIVE_UPLOAD_BASE_URL)
    }

    /// Creates a factory with custom base URLs (useful for testing)
    pub fn with_base_urls(
        identity: Arc<GoogleIdentityProvider>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            upload_base_url: upload_base_url.into(),
        }
    }

    /// Creates a factory from the `[drive]` configuration section
    pub fn from_config(identity: Arc<GoogleIdentityProvider>, config: &DriveConfig) -> Self {
        Self::with_base_urls(identity, &config.api_base_url, &config.upload_base_url)
    }

    fn client_for(&self, credential: &Credential) -> DriveClient {
        DriveClient::with_base_urls(
            credential.access_token.clone(),
            &self.base_url,
            &self.upload_base_url,
        )
        .with_http_client(self.http_client.clone())
    }
}

#[async_trait::async_trait]
impl IStorageSessionFactory for DriveSessionFactory {
    async fn new_session(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn IStorageSession>, ProviderError> {
        let needs_refresh = credential.expires_within(Duration::seconds(REFRESH_MARGIN_SECS))
            && credential
                .refresh_token
                .as_deref()
                .is_some_and(|t| !t.is_empty());

        if !needs_refresh {
            return Ok(Box::new(DriveSession::new(self.client_for(credential))));
        }

        debug!("Access token expired or expiring, refreshing before use");
        let refreshed = self.identity.refresh(credential).await?;
        let session =
            DriveSession::new(self.client_for(&refreshed)).with_refreshed_credential(refreshed);
        Ok(Box::new(session))
    }
}
