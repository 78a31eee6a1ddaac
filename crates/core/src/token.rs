//! Signed assignment tokens.
//!
//! An assignment is bound to a visitor through an HMAC-SHA256 signed
//! payload encoded as `<base64-payload>.<base64-signature>` and carried in
//! a per-(family, language) cookie. The signature is keyed by the server's
//! [`CookieKey`] and bound to the cookie name, so a token minted for one
//! assignment slot never verifies for another. A token that fails to
//! decode for any reason is treated as absent, never as an error: the
//! caller simply falls through to the fresh-assignment path.
//!
//! Expiry is enforced by the cookie transport (`Max-Age`), not by payload
//! validation; `issued_at` is carried for audit only.

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const B64: base64::engine::general_purpose::GeneralPurpose =
    base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cookie key must be at least {min} bytes, got {got}")]
    TooShort { min: usize, got: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A 256-bit HMAC-SHA256 signing key for assignment cookies.
///
/// Sourced from configuration (base64 env value or key file), never a
/// hardcoded literal.
#[derive(Clone)]
pub struct CookieKey {
    bytes: Vec<u8>,
}

impl CookieKey {
    pub const MIN_LEN: usize = 32;

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyError> {
        if bytes.len() < Self::MIN_LEN {
            return Err(KeyError::TooShort {
                min: Self::MIN_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    /// Generate a new random 256-bit key.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { bytes: key }
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Self::from_bytes(bytes)
    }

    /// Read a base64-encoded key from a file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, KeyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_base64(&contents)
    }
}

/// Signed token payload. `variant` is the assigned survey variant id.
#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    variant: String,
    issued_at: DateTime<Utc>,
}

/// Stateless codec for assignment tokens. Encode and decode are pure
/// functions of the key, so the codec needs no locking.
#[derive(Clone)]
pub struct AssignmentCodec {
    key: CookieKey,
}

impl AssignmentCodec {
    pub fn new(key: CookieKey) -> Self {
        Self { key }
    }

    /// Sign `variant` for the assignment slot named by `cookie_name`.
    pub fn encode(&self, cookie_name: &str, variant: &str) -> String {
        let payload = TokenPayload {
            variant: variant.to_string(),
            issued_at: Utc::now(),
        };
        // TokenPayload serialization cannot fail: string + timestamp.
        let payload_json =
            serde_json::to_vec(&payload).expect("token payload serializes infallibly");
        let signature = self.sign(cookie_name, &payload_json);
        format!("{}.{}", B64.encode(&payload_json), B64.encode(signature))
    }

    /// Recover the variant from a token, or `None` if the token is
    /// malformed, tampered with, or signed for a different slot.
    pub fn decode(&self, cookie_name: &str, token: &str) -> Option<String> {
        let (payload_b64, sig_b64) = token.split_once('.')?;

        let payload_json = match B64.decode(payload_b64) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(cookie = %cookie_name, error = %e, "Token payload is not valid base64");
                return None;
            }
        };
        let signature = B64.decode(sig_b64).ok()?;

        let mut mac = self.mac(cookie_name);
        mac.update(&payload_json);
        if mac.verify_slice(&signature).is_err() {
            debug!(cookie = %cookie_name, "Token signature verification failed");
            return None;
        }

        let payload: TokenPayload = serde_json::from_slice(&payload_json).ok()?;
        Some(payload.variant)
    }

    fn sign(&self, cookie_name: &str, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac(cookie_name);
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self, cookie_name: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key.bytes).expect("HMAC accepts any key length");
        // Bind the signature to the slot so tokens cannot be replayed
        // across (family, language) cookies.
        mac.update(cookie_name.as_bytes());
        mac.update(b"\x00");
        mac
    }
}
