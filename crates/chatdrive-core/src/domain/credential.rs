//! Authorization records
//!
//! - [`Credential`] - the persisted OAuth token set for one user
//! - [`CsrfState`] - the single-use nonce binding an authorization attempt
//!   to the user who started it
//! - [`ConnectionState`] - derived connected/disconnected state

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Nonce, UserIdentity};

// ============================================================================
// Credential
// ============================================================================

/// OAuth token set authorizing access to a user's remote storage account
///
/// Opaque to the core beyond being presentable to the storage session
/// factory and the revocation endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for storage API requests
    pub access_token: String,
    /// Long-lived token for obtaining new access tokens (offline access)
    pub refresh_token: Option<String>,
    /// When the access token expires, if the provider said so
    pub expiry: Option<DateTime<Utc>>,
    /// Token type reported by the provider, usually `Bearer`
    pub token_type: String,
}

impl Credential {
    /// Creates a bearer credential with no refresh token or expiry
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expiry: None,
            token_type: "Bearer".to_string(),
        }
    }

    /// Sets the refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Sets the access token expiry
    #[must_use]
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        self.expiry.is_some_and(|at| Utc::now() + duration >= at)
    }

    /// The token to present to the revocation endpoint
    ///
    /// Revoking a refresh token also invalidates every access token derived
    /// from it, so it is preferred when present.
    pub fn revocation_token(&self) -> &str {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expiry", &self.expiry)
            .field("token_type", &self.token_type)
            .finish()
    }
}

// ============================================================================
// CsrfState
// ============================================================================

/// Single-use handshake record created by a connect or reconnect command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfState {
    /// Random nonce sent as the OAuth `state` parameter
    pub nonce: Nonce,
    /// The user who started the authorization
    pub owner: UserIdentity,
    /// When the authorization was started
    pub created_at: DateTime<Utc>,
}

impl CsrfState {
    /// Creates a state record for `owner` with a freshly generated nonce
    pub fn issue(owner: UserIdentity) -> Self {
        Self {
            nonce: Nonce::generate(),
            owner,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the record is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now() - self.created_at > ttl
    }
}

// ============================================================================
// ConnectionState
// ============================================================================

/// Per-user connection state, derived from credential presence
///
/// Never stored. Recomputed on demand from the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A credential exists for the user
    Connected,
    /// No credential exists for the user
    Disconnected,
}

impl ConnectionState {
    /// Derives the state from an optional credential lookup result
    pub fn from_credential(credential: Option<&Credential>) -> Self {
        match credential {
            Some(_) => Self::Connected,
            None => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}
