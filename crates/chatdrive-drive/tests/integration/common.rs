//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the necessary mock endpoints on a wiremock server.
//! Metadata calls are served under `/drive/v3` and uploads under
//! `/upload/drive/v3`, mirroring the real URL layout.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatdrive_drive::auth::{GoogleIdentityProvider, GoogleOAuthConfig};
use chatdrive_drive::client::DriveClient;

pub const ACCESS_TOKEN: &str = "test-access-token";

pub fn api_base(server: &MockServer) -> String {
    format!("{}/drive/v3", server.uri())
}

pub fn upload_base(server: &MockServer) -> String {
    format!("{}/upload/drive/v3", server.uri())
}

/// Starts a mock server and returns a client pointing at it
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_urls(ACCESS_TOKEN, api_base(&server), upload_base(&server));
    (server, client)
}

/// Identity provider whose token and revoke endpoints live on `server`
pub fn identity_for(server: &MockServer) -> Arc<GoogleIdentityProvider> {
    let config = GoogleOAuthConfig::new(
        "client-id.apps.googleusercontent.com",
        "client-secret",
        "https://bot.example.com/oauth/callback",
    )
    .with_endpoints(
        format!("{}/token", server.uri()),
        format!("{}/revoke", server.uri()),
    );
    Arc::new(GoogleIdentityProvider::new(&config).unwrap())
}

/// Mounts a token endpoint returning the given JSON body with status 200
pub async fn mount_token_response(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a resumable upload pair: session creation then content PUT
pub async fn mount_resumable_upload(server: &MockServer, file_id: &str, expected_bytes: usize) {
    let session_uri = format!("{}/upload/session/abc123", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).append_header("Location", session_uri.as_str()))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/abc123"))
        .and(BodyLen(expected_bytes))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": file_id,
            "webViewLink": format!("https://drive.google.com/file/d/{}/view", file_id),
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Matches requests whose body has exactly the given length
pub struct BodyLen(pub usize);

impl wiremock::Match for BodyLen {
    fn matches(&self, request: &wiremock::Request) -> bool {
        request.body.len() == self.0
    }
}
