//! Google OAuth2 authorization code flow
//!
//! Implements the web-server variant of the Authorization Code flow: the
//! consent URL requests offline access so Google issues a refresh token, and
//! the callback code is exchanged with the client secret.
//!
//! ## Components
//!
//! - [`GoogleOAuthConfig`] - Client credentials and endpoints
//! - [`GoogleIdentityProvider`] - Consent URL, code exchange, refresh, revocation

use chrono::{Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponseType, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, StandardErrorResponse,
    TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};

use chatdrive_core::config::GoogleConfig;
use chatdrive_core::domain::{Credential, Nonce, ProviderError};
use chatdrive_core::ports::IIdentityProvider;

use crate::DriveError;

/// Scope granting access to files this application creates
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type TokenError = RequestTokenError<
    HttpClientError<reqwest::Error>,
    StandardErrorResponse<BasicErrorResponseType>,
>;

// ============================================================================
// GoogleOAuthConfig
// ============================================================================

/// Configuration for the Google OAuth2 flow
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Public URL of the `/oauth/callback` endpoint
    pub redirect_uri: String,
    /// Consent page endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Revocation endpoint
    pub revoke_url: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl GoogleOAuthConfig {
    /// Creates a config for the public Google endpoints
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
        }
    }

    /// Points the token and revocation endpoints elsewhere (useful for testing)
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        revoke_url: impl Into<String>,
    ) -> Self {
        self.token_url = token_url.into();
        self.revoke_url = revoke_url.into();
        self
    }

    /// Replaces the requested scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

impl From<&GoogleConfig> for GoogleOAuthConfig {
    fn from(config: &GoogleConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_url.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            revoke_url: config.revoke_url.clone(),
            scopes: config.scopes.clone(),
        }
    }
}

// ============================================================================
// GoogleIdentityProvider
// ============================================================================

/// Google OAuth2 client using the `oauth2` crate
pub struct GoogleIdentityProvider {
    client: ConfiguredClient,
    http_client: reqwest::Client,
    scopes: Vec<String>,
    revoke_url: String,
}

impl GoogleIdentityProvider {
    /// Creates a provider from the given configuration
    ///
    /// # Errors
    /// Returns [`DriveError::Configuration`] if any endpoint is not a valid URL
    pub fn new(config: &GoogleOAuthConfig) -> Result<Self, DriveError> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone())
                    .map_err(|e| DriveError::Configuration(format!("Invalid auth URL: {}", e)))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| DriveError::Configuration(format!("Invalid token URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| {
                    DriveError::Configuration(format!("Invalid redirect URI: {}", e))
                })?,
            );

        url::Url::parse(&config.revoke_url)
            .map_err(|e| DriveError::Configuration(format!("Invalid revoke URL: {}", e)))?;

        // Token endpoints must not be followed through redirects
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            http_client,
            scopes: config.scopes.clone(),
            revoke_url: config.revoke_url.clone(),
        })
    }

    /// Builds the consent URL carrying `nonce` as the `state` parameter
    pub fn consent_url(&self, nonce: &Nonce) -> String {
        let state = nonce.as_str().to_string();
        let mut request = self.client.authorize_url(|| CsrfToken::new(state));

        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, _) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        debug!("Generated authorization URL");
        url.to_string()
    }

    /// Exchanges an authorization code for a credential
    pub async fn exchange(&self, code: &str) -> Result<Credential, DriveError> {
        info!("Exchanging authorization code for tokens");

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(map_token_error)?;

        if token.refresh_token().is_none() {
            warn!("Token response carried no refresh token");
        }

        info!("Successfully obtained OAuth tokens");
        Ok(credential_from_response(&token, None))
    }

    /// Obtains a fresh access token using the credential's refresh token
    ///
    /// The previous refresh token is kept when Google does not rotate it.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, DriveError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DriveError::InvalidGrant("No refresh token available".into()))?;

        info!("Refreshing access token");

        let token = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(map_token_error)?;

        info!("Successfully refreshed access token");
        Ok(credential_from_response(&token, Some(refresh_token)))
    }

    /// Revokes a token at the revocation endpoint
    pub async fn revoke_token(&self, token: &str) -> Result<(), DriveError> {
        let response = self
            .http_client
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await?;

        if response.status().is_success() {
            info!("Token revoked");
            Ok(())
        } else {
            Err(DriveError::from_response(response).await)
        }
    }
}

#[async_trait::async_trait]
impl IIdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, nonce: &Nonce) -> String {
        self.consent_url(nonce)
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError> {
        self.exchange(code).await.map_err(ProviderError::from)
    }

    async fn revoke(&self, token: &str) -> Result<(), ProviderError> {
        self.revoke_token(token).await.map_err(ProviderError::from)
    }
}

fn credential_from_response(token: &BasicTokenResponse, previous_refresh: Option<&str>) -> Credential {
    let lifetime = token
        .expires_in()
        .map(|d| Duration::seconds(d.as_secs() as i64))
        .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

    let refresh_token = token
        .refresh_token()
        .map(|t| t.secret().to_string())
        .or_else(|| previous_refresh.map(str::to_string));

    let mut credential =
        Credential::bearer(token.access_token().secret().to_string()).with_expiry(Utc::now() + lifetime);
    credential.refresh_token = refresh_token;
    credential
}

fn map_token_error(e: TokenError) -> DriveError {
    match e {
        RequestTokenError::ServerResponse(resp) => {
            let message = resp
                .error_description()
                .cloned()
                .unwrap_or_else(|| resp.error().to_string());
            match resp.error() {
                BasicErrorResponseType::InvalidGrant => DriveError::InvalidGrant(message),
                other => DriveError::TokenRequest(format!("{}: {}", other, message)),
            }
        }
        RequestTokenError::Request(e) => match e {
            HttpClientError::Reqwest(inner) => DriveError::NetworkError(*inner),
            other => DriveError::TokenRequest(other.to_string()),
        },
        RequestTokenError::Parse(e, _) => {
            DriveError::InvalidResponse(format!("Failed to parse token response: {}", e))
        }
        RequestTokenError::Other(msg) => DriveError::TokenRequest(msg),
    }
}
