//! Google Drive v3 API client
//!
//! Provides an authenticated HTTP client for the Drive v3 metadata and upload
//! endpoints. Handles the bearer header and endpoint construction; the
//! operations themselves live in [`crate::files`] and [`crate::upload`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatdrive_core::domain::FolderId;
//! use chatdrive_drive::{client::DriveClient, files};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("access-token-here");
//! let folder = files::find_folder(&client, "LINE Bot Uploads", &FolderId::root()).await?;
//! println!("{:?}", folder);
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use crate::DriveError;

/// Base URL for the Drive v3 metadata API
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for the Drive v3 upload API
pub const DRIVE_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// HTTP client for Drive v3 calls made on behalf of one user
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests
    base_url: String,
    /// Base URL for upload requests
    upload_base_url: String,
    /// Current OAuth2 access token
    access_token: String,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token with a Drive scope
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_urls(access_token, DRIVE_BASE_URL, DRIVE_UPLOAD_BASE_URL)
    }

    /// Creates a new DriveClient with custom base URLs (useful for testing)
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    /// * `base_url` - Base URL for metadata requests
    /// * `upload_base_url` - Base URL for upload requests
    pub fn with_base_urls(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_slash(base_url.into()),
            upload_base_url: trim_slash(upload_base_url.into()),
            access_token: access_token.into(),
        }
    }

    /// Reuses an existing connection pool
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Creates an authenticated request against the metadata API
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Creates an authenticated request against the upload API
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Creates an authenticated request to an absolute URL
    ///
    /// Used for resumable session URIs handed back by the upload API.
    pub fn absolute_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    /// Returns the base URL for metadata requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the base URL for upload requests
    pub fn upload_base_url(&self) -> &str {
        &self.upload_base_url
    }
}

/// Passes success responses through and turns the rest into [`DriveError`]
pub async fn check_status(response: Response) -> Result<Response, DriveError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(DriveError::from_response(response).await)
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
