//! Integration tests for folder lookup, creation, and listings

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use chatdrive_core::domain::{FolderId, FolderPath, ProviderError};
use chatdrive_core::usecases::resolve_folder;
use chatdrive_drive::files;
use chatdrive_drive::provider::DriveSession;
use chatdrive_drive::DriveError;

use crate::common::setup_drive_mock;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

fn folder(id: &str) -> FolderId {
    FolderId::new(id).unwrap()
}

#[tokio::test]
async fn test_find_folder_returns_first_match() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param(
            "q",
            format!(
                "mimeType='{}' and trashed=false and name='LINE Bot Uploads' and 'root' in parents",
                FOLDER_MIME
            ),
        ))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{"id": "root-folder-1"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = files::find_folder(&client, "LINE Bot Uploads", &FolderId::root())
        .await
        .unwrap();

    assert_eq!(found, Some(folder("root-folder-1")));
}

#[tokio::test]
async fn test_find_folder_missing() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
        .mount(&server)
        .await;

    let found = files::find_folder(&client, "2025-06", &folder("parent"))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_folder_escapes_quotes() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!(
                "mimeType='{}' and trashed=false and name='Bob\\'s files' and 'root' in parents",
                FOLDER_MIME
            ),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    files::find_folder(&client, "Bob's files", &FolderId::root())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_folder_posts_metadata() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_json(serde_json::json!({
            "name": "2025-06",
            "mimeType": FOLDER_MIME,
            "parents": ["root-folder-1"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "month-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = files::create_folder(&client, "2025-06", &folder("root-folder-1"))
        .await
        .unwrap();
    assert_eq!(id, folder("month-1"));
}

#[tokio::test]
async fn test_list_folders_orders_by_name_desc() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("orderBy", "name desc"))
        .and(query_param("pageSize", "24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{"id": "m-2025-06"}, {"id": "m-2025-05"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folders = files::list_folders(&client, &folder("root-folder-1"), 24)
        .await
        .unwrap();
    assert_eq!(folders, vec![folder("m-2025-06"), folder("m-2025-05")]);
}

#[tokio::test]
async fn test_list_recent_files() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!(
                "mimeType!='{}' and trashed=false and ('r' in parents or 'm1' in parents)",
                FOLDER_MIME
            ),
        ))
        .and(query_param("orderBy", "createdTime desc"))
        .and(query_param("pageSize", "5"))
        .and(query_param("fields", "files(id,name,webViewLink,createdTime)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                {
                    "id": "f2",
                    "name": "102-b.jpg",
                    "webViewLink": "https://drive.google.com/file/d/f2/view",
                    "createdTime": "2025-06-02T00:00:00Z"
                },
                {
                    "id": "f1",
                    "name": "101-a.jpg",
                    "webViewLink": "https://drive.google.com/file/d/f1/view",
                    "createdTime": "2025-06-01T00:00:00Z"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let recent = files::list_recent_files(&client, &[folder("r"), folder("m1")], 5)
        .await
        .unwrap();

    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].name, "102-b.jpg");
    assert_eq!(recent[1].view_url, "https://drive.google.com/file/d/f1/view");
}

#[tokio::test]
async fn test_list_recent_files_without_parents_makes_no_request() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let recent = files::list_recent_files(&client, &[], 5).await.unwrap();
    assert!(recent.is_empty());
}

#[tokio::test]
async fn test_unauthorized_maps_to_status_401() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid Credentials"))
        .mount(&server)
        .await;

    let err = files::find_folder(&client, "x", &FolderId::root())
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Unauthorized(_)));

    let provider: ProviderError = err.into();
    assert_eq!(provider.status(), Some(401));
}

#[tokio::test]
async fn test_resolve_folder_creates_only_missing_segments() {
    let (server, client) = setup_drive_mock().await;

    // AppRoot exists under root
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!(
                "mimeType='{}' and trashed=false and name='AppRoot' and 'root' in parents",
                FOLDER_MIME
            ),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{"id": "app-root"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // 2025-06 does not exist yet
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!(
                "mimeType='{}' and trashed=false and name='2025-06' and 'app-root' in parents",
                FOLDER_MIME
            ),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "month"})))
        .expect(1)
        .mount(&server)
        .await;

    let session = DriveSession::new(client);
    let path = FolderPath::new(["AppRoot", "2025-06"]).unwrap();

    let id = resolve_folder(&session, &path).await.unwrap();
    assert_eq!(id, folder("month"));
}
