//! Remote placement types
//!
//! - [`FolderPath`] - named location under the drive root
//! - [`UploadResult`] and [`RemoteFile`] - what the storage API hands back
//! - [`MediaContent`] - a streamed media body with its declared metadata

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// `strftime` pattern for the dated subfolder
pub const MONTH_FOLDER_FORMAT: &str = "%Y-%m";

// ============================================================================
// FolderPath
// ============================================================================

/// Ordered folder names starting at the drive root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// Creates a path from its segments
    ///
    /// # Errors
    /// Returns error if the path is empty or any segment is blank
    pub fn new<I, S>(segments: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(DomainError::InvalidFolderName(
                "Folder path must have at least one segment".to_string(),
            ));
        }
        if let Some(blank) = segments.iter().find(|s| s.trim().is_empty()) {
            return Err(DomainError::InvalidFolderName(format!(
                "Folder name cannot be blank: {blank:?}"
            )));
        }
        Ok(Self { segments })
    }

    /// `[root_name, "YYYY-MM"]` for the month containing `at`
    ///
    /// # Errors
    /// Returns error if `root_name` is blank
    pub fn monthly<Tz>(root_name: &str, at: &DateTime<Tz>) -> Result<Self, DomainError>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self::new([
            root_name.to_string(),
            at.format(MONTH_FOLDER_FORMAT).to_string(),
        ])
    }

    /// The folder names in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last folder name
    pub fn leaf(&self) -> &str {
        // Construction guarantees at least one segment
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

// ============================================================================
// Remote results
// ============================================================================

/// A file created by the upload orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Storage provider file identifier
    pub remote_file_id: String,
    /// Shareable link for viewing the file
    pub view_url: String,
}

/// A file entry returned by a recent-files query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Storage provider file identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Shareable link for viewing the file
    pub view_url: String,
    /// Creation time reported by the provider
    pub created_at: Option<DateTime<chrono::Utc>>,
}

// ============================================================================
// MediaContent
// ============================================================================

/// Streamed body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Media body to relay into storage
///
/// The stream is consumed exactly once by the storage session; it is never
/// buffered whole.
pub struct MediaContent {
    /// Body chunks
    pub stream: ByteStream,
    /// MIME type declared by the source, if any
    pub content_type: Option<String>,
    /// Body length declared by the source, if any
    pub content_length: Option<u64>,
}

impl MediaContent {
    /// Wraps a stream with no declared metadata
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            content_type: None,
            content_length: None,
        }
    }

    /// Builds content from an in-memory buffer
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        let len = data.len() as u64;
        Self {
            stream: Box::pin(futures_util::stream::once(async move { Ok(data) })),
            content_type: None,
            content_length: Some(len),
        }
    }

    /// Sets the declared MIME type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the declared length
    #[must_use]
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }
}

impl fmt::Debug for MediaContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaContent")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
