//! Identity provider port (driven/secondary port)
//!
//! Covers the three OAuth operations the connection lifecycle needs:
//! building the consent URL, exchanging the authorization code, and
//! revoking a token. Errors are [`ProviderError`] so they can be classified.

use crate::domain::{Credential, Nonce, ProviderError};

/// OAuth 2.0 authorization-code provider
#[async_trait::async_trait]
pub trait IIdentityProvider: Send + Sync {
    /// Consent URL carrying `nonce` as the `state` parameter
    ///
    /// The URL must request offline (refresh-capable) access.
    fn authorization_url(&self, nonce: &Nonce) -> String;

    /// Exchanges an authorization code for a credential
    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError>;

    /// Revokes `token` (refresh or access token) at the provider
    async fn revoke(&self, token: &str) -> Result<(), ProviderError>;
}
