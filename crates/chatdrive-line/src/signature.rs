//! Webhook signature verification
//!
//! LINE signs every webhook delivery with `X-Line-Signature`, the base64
//! encoded HMAC-SHA256 of the raw request body keyed by the channel secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verifies webhook bodies against the channel secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(channel_secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: channel_secret.as_ref().to_vec(),
        }
    }

    /// Returns true when `signature` matches `body`
    ///
    /// The comparison is constant-time. A signature that is not valid base64
    /// never matches.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = STANDARD.decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    /// Computes the signature LINE would send for `body`
    pub fn sign(&self, body: &[u8]) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
