//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the identifiers that
//! flow through the connection lifecycle. Each newtype ensures data validity
//! at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Number of random bytes behind every CSRF nonce
pub const NONCE_BYTES: usize = 32;

// ============================================================================
// UserIdentity
// ============================================================================

/// Chat-platform participant identifier
///
/// Opaque to this crate. It is the only key into the credential store and
/// the subject bound into CSRF state records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Create a new UserIdentity
    ///
    /// # Errors
    /// Returns error if the identifier is empty or contains whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidIdentity(
                "User identity cannot be empty".to_string(),
            ));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidIdentity(format!(
                "User identity contains whitespace: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserIdentity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserIdentity {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserIdentity> for String {
    fn from(id: UserIdentity) -> Self {
        id.0
    }
}

// ============================================================================
// Nonce
// ============================================================================

/// Random, URL-safe CSRF nonce carried in the OAuth `state` parameter
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nonce(String);

impl Nonce {
    /// Generate a fresh nonce from the operating system RNG
    ///
    /// The nonce is [`NONCE_BYTES`] random bytes, base64url-encoded without
    /// padding.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Wrap a nonce received from a callback
    ///
    /// # Errors
    /// Returns error if the value is empty or not URL-safe base64 alphabet
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::InvalidNonce("Nonce cannot be empty".to_string()));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidNonce(
                "Nonce contains characters outside the URL-safe alphabet".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Nonces are bearer secrets until consumed; keep them out of debug output.
impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "Nonce({prefix}…)")
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Nonce {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Nonce> for String {
    fn from(n: Nonce) -> Self {
        n.0
    }
}

// ============================================================================
// FolderId
// ============================================================================

/// Remote storage folder identifier
///
/// [`FolderId::root`] is the provider's sentinel for the top of the drive
/// and is the parent of the first [`super::FolderPath`] segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

/// Provider alias for the top-level folder of a drive
const ROOT_ALIAS: &str = "root";

impl FolderId {
    /// Create a new FolderId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains quote characters, which
    /// would break provider query expressions
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidFolderId(
                "Folder ID cannot be empty".to_string(),
            ));
        }
        if id.contains('\'') || id.contains('\\') {
            return Err(DomainError::InvalidFolderId(format!(
                "Folder ID contains invalid characters: {id}"
            )));
        }
        Ok(Self(id))
    }

    /// The drive root sentinel
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_ALIAS.to_string())
    }

    /// Returns true if this is the drive root sentinel
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ALIAS
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FolderId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}
