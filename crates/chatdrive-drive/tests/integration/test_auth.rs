//! Integration tests for the Google token and revocation endpoints

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use chatdrive_core::domain::{Credential, ProviderError};
use chatdrive_core::ports::IIdentityProvider;
use chatdrive_drive::DriveError;

use crate::common::{identity_for, mount_token_response};

#[tokio::test]
async fn test_exchange_code_returns_credential() {
    let server = wiremock::MockServer::start().await;
    mount_token_response(
        &server,
        serde_json::json!({
            "access_token": "ya29.fresh",
            "refresh_token": "1//refresh",
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/drive.file"
        }),
    )
    .await;

    let credential = identity_for(&server).exchange_code("4/auth-code").await.unwrap();

    assert_eq!(credential.access_token, "ya29.fresh");
    assert_eq!(credential.refresh_token.as_deref(), Some("1//refresh"));
    assert!(credential.expiry.is_some());
    assert!(!credential.is_expired());
}

#[tokio::test]
async fn test_exchange_sends_code_and_grant_type() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fauth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "at",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = identity_for(&server).exchange("4/auth-code").await.unwrap();
    assert!(credential.refresh_token.is_none());
}

#[tokio::test]
async fn test_invalid_grant_is_distinguished() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    let err = identity_for(&server).exchange_code("used-code").await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidGrant(_)));
}

#[tokio::test]
async fn test_other_token_errors_are_not_invalid_grant() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client"
        })))
        .mount(&server)
        .await;

    let err = identity_for(&server).exchange("code").await.unwrap_err();
    assert!(matches!(err, DriveError::TokenRequest(_)));
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.renewed",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let old = Credential::bearer("ya29.old").with_refresh_token("1//keep");
    let renewed = identity_for(&server).refresh(&old).await.unwrap();

    assert_eq!(renewed.access_token, "ya29.renewed");
    assert_eq!(renewed.refresh_token.as_deref(), Some("1//keep"));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails_locally() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = identity_for(&server)
        .refresh(&Credential::bearer("at"))
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::InvalidGrant(_)));
}

#[tokio::test]
async fn test_revoke_posts_token() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/revoke"))
        .and(body_string_contains("token=1%2F%2Frefresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    identity_for(&server).revoke("1//refresh").await.unwrap();
}

#[tokio::test]
async fn test_revoke_of_unknown_token_is_an_error() {
    let server = wiremock::MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/revoke"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_token"
        })))
        .mount(&server)
        .await;

    let err = identity_for(&server).revoke("gone").await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}
