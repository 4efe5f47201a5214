//! Integration tests for resumable streaming uploads

use bytes::Bytes;
use futures_util::stream;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use chatdrive_core::domain::{FolderId, MediaContent};
use chatdrive_drive::upload;
use chatdrive_drive::DriveError;

use crate::common::{mount_resumable_upload, setup_drive_mock};

#[tokio::test]
async fn test_upload_file_streams_content() {
    let (server, client) = setup_drive_mock().await;
    mount_resumable_upload(&server, "file-123", 11).await;

    let content = MediaContent::from_bytes(Bytes::from_static(b"hello world"))
        .with_content_type("image/jpeg");

    let result = upload::upload_file(
        &client,
        "4711-photo.jpg",
        &FolderId::new("month").unwrap(),
        content,
    )
    .await
    .unwrap();

    assert_eq!(result.remote_file_id, "file-123");
    assert_eq!(result.view_url, "https://drive.google.com/file/d/file-123/view");
}

#[tokio::test]
async fn test_upload_of_chunked_stream_without_length() {
    let (server, client) = setup_drive_mock().await;
    mount_resumable_upload(&server, "file-chunked", 9).await;

    let chunks = vec![
        Ok(Bytes::from_static(b"abc")),
        Ok(Bytes::from_static(b"def")),
        Ok(Bytes::from_static(b"ghi")),
    ];
    let content = MediaContent::new(Box::pin(stream::iter(chunks)));

    let result = upload::upload_file(&client, "clip.mp4", &FolderId::root(), content)
        .await
        .unwrap();
    assert_eq!(result.remote_file_id, "file-chunked");
}

#[tokio::test]
async fn test_session_request_carries_metadata() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .and(header("X-Upload-Content-Type", "audio/m4a"))
        .and(header("X-Upload-Content-Length", "42"))
        .and(body_json(serde_json::json!({
            "name": "99-voice.m4a",
            "parents": ["month"],
        })))
        .respond_with(
            ResponseTemplate::new(200).append_header("Location", "https://upload.example/s/1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uri = upload::create_upload_session(
        &client,
        "99-voice.m4a",
        &FolderId::new("month").unwrap(),
        "audio/m4a",
        Some(42),
    )
    .await
    .unwrap();
    assert_eq!(uri, "https://upload.example/s/1");
}

#[tokio::test]
async fn test_session_without_location_is_invalid_response() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = upload::upload_file(
        &client,
        "a.jpg",
        &FolderId::root(),
        MediaContent::from_bytes(Bytes::from_static(b"x")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriveError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_failing_stream_aborts_upload() {
    let (server, client) = setup_drive_mock().await;
    let session_uri = format!("{}/upload/session/broken", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).append_header("Location", session_uri.as_str()))
        .mount(&server)
        .await;

    let chunks = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "source hung up")),
    ];
    let content = MediaContent::new(Box::pin(stream::iter(chunks)));

    let result = upload::upload_file(&client, "a.jpg", &FolderId::root(), content).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_quota_error_is_forbidden() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_string("storageQuotaExceeded"))
        .mount(&server)
        .await;

    let err = upload::upload_file(
        &client,
        "a.jpg",
        &FolderId::root(),
        MediaContent::from_bytes(Bytes::from_static(b"x")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriveError::Forbidden(ref body) if body.contains("storageQuotaExceeded")));
}
