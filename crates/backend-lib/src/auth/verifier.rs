//! Signed token verification.
use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use metrics::counter;
use tracing::debug;

use sentinel_common::TokenKind;

use super::claims::{RawClaims, TokenClaims};
use super::keys::SigningKey;
use crate::clock::Clock;
use crate::config::TokenSettings;
use crate::error::AuthError;
use crate::metrics::TOKEN_REJECTED;

/// Validates tokens minted by [`super::TokenIssuer`] with the same key.
///
/// Checks run in a fixed order and the first failure rejects the whole token:
/// 1. signature and structure ([`AuthError::InvalidSignature`])
/// 2. expiry ([`AuthError::TokenExpired`])
/// 3. required claims ([`AuthError::MissingClaim`])
/// 4. kind ([`AuthError::WrongTokenKind`])
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(key: &SigningKey, clock: Arc<dyn Clock>) -> Self {
        // jsonwebtoken only checks the signature here; every claim is checked
        // below against our own clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Self {
            decoding: DecodingKey::from_secret(key.as_bytes()),
            validation,
            clock,
        }
    }

    pub fn from_settings(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let key = SigningKey::from_config(settings.signing_key.as_deref())?;
        Ok(Self::new(&key, clock))
    }

    /// Verify `token` and require it to be of `expected` kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let result = self.check(token, expected);
        if let Err(err) = &result {
            debug!(expected = %expected, code = err.error_code(), "token rejected");
            counter!(TOKEN_REJECTED, "code" => err.error_code()).increment(1);
        }
        result
    }

    fn check(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError> {
        let raw = decode::<RawClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| {
                debug!(reason = ?err.kind(), "token failed signature or structure check");
                AuthError::InvalidSignature
            })?
            .claims;

        if let Some(exp) = raw.exp {
            if self.clock.now().timestamp() >= exp {
                return Err(AuthError::TokenExpired);
            }
        }

        let claims = raw.into_claims()?;

        if claims.kind != expected {
            return Err(AuthError::WrongTokenKind {
                expected,
                found: claims.kind,
            });
        }
        Ok(claims)
    }
}
