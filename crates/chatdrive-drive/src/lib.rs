//! ChatDrive Drive - Google Drive API and Google OAuth adapters
//!
//! Provides async clients for:
//! - OAuth2 authorization code flow with offline access (consent URL,
//!   code exchange, refresh, revocation)
//! - Folder lookup, folder creation, and recent-file listing via Drive v3
//! - Streaming uploads through Drive resumable upload sessions
//!
//! ## Modules
//!
//! - [`auth`] - Google OAuth2 identity provider
//! - [`client`] - Authenticated Drive v3 HTTP client
//! - [`files`] - `files.list` / `files.create` operations
//! - [`upload`] - Resumable streaming upload
//! - [`provider`] - `IStorageSession` / `IStorageSessionFactory` implementations

pub mod auth;
pub mod client;
pub mod files;
pub mod provider;
pub mod upload;

use chatdrive_core::domain::ProviderError;
use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Errors that can occur when communicating with Google APIs
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit or quota exceeded
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The token endpoint rejected the grant
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// The token endpoint failed for another reason
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A configured URL or identifier is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DriveError {
    /// Builds the error for a non-success response, consuming its body
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, body)
    }

    /// Maps a status code and body to an error variant
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => Self::TooManyRequests(message),
            s if s.is_server_error() => Self::ServerError(message),
            s => Self::Api {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// HTTP status behind this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::TooManyRequests(_) => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::NetworkError(e) => e.status().map(|s| s.as_u16()),
            Self::ServerError(_)
            | Self::InvalidGrant(_)
            | Self::TokenRequest(_)
            | Self::InvalidResponse(_)
            | Self::Configuration(_) => None,
        }
    }
}

impl From<DriveError> for ProviderError {
    fn from(e: DriveError) -> Self {
        match e {
            DriveError::InvalidGrant(msg) => ProviderError::InvalidGrant(msg),
            DriveError::InvalidResponse(msg) => ProviderError::InvalidResponse(msg),
            DriveError::NetworkError(ref inner) if inner.status().is_none() => {
                ProviderError::Network(inner.to_string())
            }
            DriveError::ServerError(msg) => ProviderError::Http {
                status: 500,
                message: msg,
            },
            DriveError::TokenRequest(msg) | DriveError::Configuration(msg) => {
                ProviderError::Other(msg)
            }
            other => match other.status() {
                Some(status) => ProviderError::Http {
                    status,
                    message: other.to_string(),
                },
                None => ProviderError::Other(other.to_string()),
            },
        }
    }
}
