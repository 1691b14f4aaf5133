// ============================
// crates/backend-lib/src/auth/keys.rs
// ============================
//! Token signing key handling.
use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::AuthError;

/// Shortest secret accepted for HMAC signing
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Default size of a generated secret in bytes (48 bytes = 384 bits of entropy)
const DEFAULT_KEY_BYTES: usize = 48;

/// Process-wide HMAC secret shared by the token issuer and verifier.
///
/// The bytes are wiped on drop and never printed.
#[derive(Clone)]
pub struct SigningKey {
    secret: Zeroizing<Vec<u8>>,
}

impl SigningKey {
    /// Wrap raw secret bytes, rejecting anything shorter than [`MIN_SIGNING_KEY_BYTES`]
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, AuthError> {
        let secret = Zeroizing::new(secret.into());
        if secret.len() < MIN_SIGNING_KEY_BYTES {
            return Err(AuthError::Config(format!(
                "signing key must be at least {MIN_SIGNING_KEY_BYTES} bytes, got {}",
                secret.len()
            )));
        }
        Ok(Self { secret })
    }

    /// Build from an optional configured secret; absence is a configuration error
    pub fn from_config(secret: Option<&str>) -> Result<Self, AuthError> {
        match secret {
            Some(secret) => Self::new(secret.as_bytes()),
            None => Err(AuthError::Config("signing key is not set".to_string())),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.secret.len())
            .finish_non_exhaustive()
    }
}

/** Generate a fresh signing secret
Uses an OS-seeded CSPRNG and encodes the bytes URL-safe base64 without padding,
so the result can be pasted straight into `SENTINEL_TOKENS__SIGNING_KEY`. */
pub fn generate_signing_key() -> String {
    generate_signing_key_with_size(DEFAULT_KEY_BYTES)
}

/** Generate a signing secret from `bytes` random bytes
# Arguments
* `bytes` - Amount of entropy; values below the minimum are raised to it */
pub fn generate_signing_key_with_size(bytes: usize) -> String {
    let mut buffer = Zeroizing::new(vec![0u8; bytes.max(MIN_SIGNING_KEY_BYTES)]);
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer.as_slice())
}
