//! Integration tests for session creation and token refresh

use chrono::{Duration, Utc};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use chatdrive_core::domain::{Credential, FolderId, ProviderError};
use chatdrive_core::ports::IStorageSessionFactory;
use chatdrive_drive::provider::DriveSessionFactory;

use crate::common::{api_base, identity_for, mount_token_response, upload_base};

#[tokio::test]
async fn test_expired_credential_is_refreshed_before_use() {
    let server = wiremock::MockServer::start().await;
    mount_token_response(
        &server,
        serde_json::json!({
            "access_token": "ya29.renewed",
            "token_type": "Bearer",
            "expires_in": 3599
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer ya29.renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
        .expect(1)
        .mount(&server)
        .await;

    let factory =
        DriveSessionFactory::with_base_urls(identity_for(&server), api_base(&server), upload_base(&server));
    let expired = Credential::bearer("ya29.old")
        .with_refresh_token("1//r")
        .with_expiry(Utc::now() - Duration::minutes(5));

    let session = factory.new_session(&expired).await.unwrap();

    let refreshed = session.refreshed_credential().unwrap();
    assert_eq!(refreshed.access_token, "ya29.renewed");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("1//r"));

    let found = session.find_folder("AppRoot", &FolderId::root()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_revoked_refresh_token_fails_session() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let factory =
        DriveSessionFactory::with_base_urls(identity_for(&server), api_base(&server), upload_base(&server));
    let expired = Credential::bearer("ya29.old")
        .with_refresh_token("1//revoked")
        .with_expiry(Utc::now() - Duration::minutes(5));

    let err = factory.new_session(&expired).await.err().unwrap();
    assert!(matches!(err, ProviderError::InvalidGrant(_)));
}
