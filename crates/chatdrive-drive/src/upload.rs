//! Streaming uploads through Drive resumable upload sessions
//!
//! An upload is two requests:
//! 1. [`create_upload_session`] posts the file metadata and receives a session
//!    URI in the `Location` header
//! 2. [`upload_content`] streams the body to that URI in a single `PUT`
//!
//! The body is never buffered in full, so memory use is independent of the
//! file size.
//!
//! ## Drive API References
//!
//! - [Resumable upload](https://developers.google.com/drive/api/guides/manage-uploads#resumable)

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Method};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use chatdrive_core::domain::{FolderId, MediaContent, UploadResult};

use crate::client::{check_status, DriveClient};
use crate::files::default_view_url;
use crate::DriveError;

/// Content type sent when the source did not report one
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Response returned once the upload completes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    id: String,
    web_view_link: Option<String>,
}

/// Opens a resumable upload session for a new file
///
/// # Returns
/// The session URI to stream content to
pub async fn create_upload_session(
    client: &DriveClient,
    name: &str,
    parent: &FolderId,
    content_type: &str,
    content_length: Option<u64>,
) -> Result<String, DriveError> {
    debug!(name, parent = %parent, "Creating upload session");

    let metadata = json!({
        "name": name,
        "parents": [parent.as_str()],
    });

    let mut request = client
        .upload_request(Method::POST, "/files")
        .query(&[("uploadType", "resumable"), ("fields", "id,webViewLink")])
        .header("X-Upload-Content-Type", content_type)
        .json(&metadata);
    if let Some(len) = content_length {
        request = request.header("X-Upload-Content-Length", len.to_string());
    }

    let response = check_status(request.send().await?).await?;

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            DriveError::InvalidResponse("Upload session response has no Location header".into())
        })?;

    debug!("Upload session created");
    Ok(location)
}

/// Streams `content` to an open upload session
pub async fn upload_content(
    client: &DriveClient,
    session_uri: &str,
    content: MediaContent,
) -> Result<UploadResult, DriveError> {
    let content_type = content
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let mut request = client
        .absolute_request(Method::PUT, session_uri)
        .header(CONTENT_TYPE, content_type);
    if let Some(len) = content.content_length {
        request = request.header(CONTENT_LENGTH, len);
    }

    let response = request
        .body(Body::wrap_stream(content.stream))
        .send()
        .await?;

    let uploaded: UploadedFile = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| DriveError::InvalidResponse(format!("Failed to parse uploaded file: {}", e)))?;

    Ok(into_upload_result(uploaded))
}

/// Creates a file named `name` under `parent` from a byte stream
///
/// # Errors
/// Returns an error if the session cannot be opened or the stream fails.
/// A failed stream leaves no file behind; Drive discards incomplete sessions.
pub async fn upload_file(
    client: &DriveClient,
    name: &str,
    parent: &FolderId,
    content: MediaContent,
) -> Result<UploadResult, DriveError> {
    let content_type = content
        .content_type
        .clone()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let session_uri =
        create_upload_session(client, name, parent, &content_type, content.content_length).await?;
    let result = upload_content(client, &session_uri, content).await?;

    info!(name, file_id = %result.remote_file_id, "Upload complete");
    Ok(result)
}

fn into_upload_result(file: UploadedFile) -> UploadResult {
    UploadResult {
        view_url: file
            .web_view_link
            .unwrap_or_else(|| default_view_url(&file.id)),
        remote_file_id: file.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploaded_file_deserialization() {
        let json = r#"{"id": "1xYz", "webViewLink": "https://drive.google.com/file/d/1xYz/view"}"#;
        let result = into_upload_result(serde_json::from_str(json).unwrap());
        assert_eq!(result.remote_file_id, "1xYz");
        assert_eq!(result.view_url, "https://drive.google.com/file/d/1xYz/view");
    }

    #[test]
    fn test_uploaded_file_without_link() {
        let result = into_upload_result(serde_json::from_str(r#"{"id": "abc"}"#).unwrap());
        assert_eq!(result.view_url, "https://drive.google.com/file/d/abc/view");
    }
}
