//! Folder and file metadata operations for the Drive v3 API
//!
//! - [`find_folder`] - Looks up a non-trashed folder by exact name under a parent
//! - [`create_folder`] - Creates a folder under a parent
//! - [`list_folders`] - Lists folders under a parent, newest name first
//! - [`list_recent_files`] - Lists non-folder files under any of several parents
//!
//! ## Drive API References
//!
//! - [files.list](https://developers.google.com/drive/api/reference/rest/v3/files/list)
//! - [Search query terms](https://developers.google.com/drive/api/guides/ref-search-terms)

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use chatdrive_core::domain::{FolderId, RemoteFile};

use crate::client::{check_status, DriveClient};
use crate::DriveError;

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// ============================================================================
// Drive API response types
// ============================================================================

/// `files.list` response envelope
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// A single `File` resource, reduced to the requested fields
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: Option<String>,
    web_view_link: Option<String>,
    created_time: Option<DateTime<Utc>>,
}

impl DriveFile {
    fn into_remote_file(self) -> RemoteFile {
        let view_url = self
            .web_view_link
            .unwrap_or_else(|| default_view_url(&self.id));
        RemoteFile {
            name: self.name.unwrap_or_default(),
            view_url,
            created_at: self.created_time,
            id: self.id,
        }
    }
}

/// Browser URL Drive serves for a file id when no link is returned
pub fn default_view_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}

// ============================================================================
// Query construction
// ============================================================================

/// Escapes a value for use inside a single-quoted Drive query literal
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn folder_by_name_query(name: &str, parent: &FolderId) -> String {
    format!(
        "mimeType='{}' and trashed=false and name='{}' and '{}' in parents",
        FOLDER_MIME_TYPE,
        escape_query_value(name),
        escape_query_value(parent.as_str())
    )
}

fn folders_in_parent_query(parent: &FolderId) -> String {
    format!(
        "mimeType='{}' and trashed=false and '{}' in parents",
        FOLDER_MIME_TYPE,
        escape_query_value(parent.as_str())
    )
}

fn files_in_parents_query(parents: &[FolderId]) -> String {
    let any_parent = parents
        .iter()
        .map(|p| format!("'{}' in parents", escape_query_value(p.as_str())))
        .collect::<Vec<_>>()
        .join(" or ");
    format!(
        "mimeType!='{}' and trashed=false and ({})",
        FOLDER_MIME_TYPE, any_parent
    )
}

fn folder_id(raw: String) -> Result<FolderId, DriveError> {
    FolderId::new(raw).map_err(|e| DriveError::InvalidResponse(e.to_string()))
}

async fn list(client: &DriveClient, query: &[(&str, String)]) -> Result<FileList, DriveError> {
    let response = client
        .request(Method::GET, "/files")
        .query(query)
        .send()
        .await?;

    check_status(response)
        .await?
        .json::<FileList>()
        .await
        .map_err(|e| DriveError::InvalidResponse(format!("Failed to parse file list: {}", e)))
}

// ============================================================================
// Operations
// ============================================================================

/// Finds a folder by exact name directly under `parent`
///
/// # Returns
/// - `Some(id)` of the first match
/// - `None` if no non-trashed folder has that name
pub async fn find_folder(
    client: &DriveClient,
    name: &str,
    parent: &FolderId,
) -> Result<Option<FolderId>, DriveError> {
    debug!(name, parent = %parent, "Looking up folder");

    let page = list(
        client,
        &[
            ("q", folder_by_name_query(name, parent)),
            ("pageSize", "1".to_string()),
            ("fields", "files(id)".to_string()),
            ("spaces", "drive".to_string()),
        ],
    )
    .await?;

    page.files
        .into_iter()
        .next()
        .map(|f| folder_id(f.id))
        .transpose()
}

/// Creates a folder named `name` under `parent`
pub async fn create_folder(
    client: &DriveClient,
    name: &str,
    parent: &FolderId,
) -> Result<FolderId, DriveError> {
    debug!(name, parent = %parent, "Creating folder");

    let body = json!({
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
        "parents": [parent.as_str()],
    });

    let response = client
        .request(Method::POST, "/files")
        .query(&[("fields", "id")])
        .json(&body)
        .send()
        .await?;

    let created: DriveFile = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::InvalidResponse(format!("Failed to parse created folder: {}", e)))?;

    folder_id(created.id)
}

/// Lists up to `limit` folders under `parent`, ordered by name descending
///
/// Monthly folders are named `YYYY-MM`, so this yields the newest months first.
pub async fn list_folders(
    client: &DriveClient,
    parent: &FolderId,
    limit: u32,
) -> Result<Vec<FolderId>, DriveError> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let page = list(
        client,
        &[
            ("q", folders_in_parent_query(parent)),
            ("orderBy", "name desc".to_string()),
            ("pageSize", limit.to_string()),
            ("fields", "files(id)".to_string()),
            ("spaces", "drive".to_string()),
        ],
    )
    .await?;

    page.files.into_iter().map(|f| folder_id(f.id)).collect()
}

/// Lists up to `limit` non-folder files under any of `parents`, newest first
pub async fn list_recent_files(
    client: &DriveClient,
    parents: &[FolderId],
    limit: u32,
) -> Result<Vec<RemoteFile>, DriveError> {
    if parents.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let page = list(
        client,
        &[
            ("q", files_in_parents_query(parents)),
            ("orderBy", "createdTime desc".to_string()),
            ("pageSize", limit.to_string()),
            (
                "fields",
                "files(id,name,webViewLink,createdTime)".to_string(),
            ),
            ("spaces", "drive".to_string()),
        ],
    )
    .await?;

    debug!(count = page.files.len(), "Listed recent files");
    Ok(page
        .files
        .into_iter()
        .map(DriveFile::into_remote_file)
        .collect())
}
