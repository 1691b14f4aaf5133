//! Claims carried inside every signed token.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use sentinel_common::TokenKind;

use crate::error::AuthError;

/// Value of the `iss` claim on every token this service signs
pub const ISSUER: &str = "sentinel-auth";

/// Validated token payload.
///
/// Wire shape: `{"sub", "iat", "exp", "iss", "type"}` with unix-second timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issuer, always [`ISSUER`]
    pub iss: String,
    /// Token kind (access or refresh)
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl TokenClaims {
    pub(crate) fn new(subject: &str, kind: TokenKind, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: ISSUER.to_string(),
            kind,
        }
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Lifetime the token was issued with
    pub fn lifetime(&self) -> Duration {
        Duration::seconds(self.exp - self.iat)
    }
}

/// Payload as it comes off the wire, before any field is trusted.
///
/// Unknown fields make deserialization fail, so a payload of any other shape
/// never reaches the field checks.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawClaims {
    pub(crate) sub: Option<String>,
    pub(crate) iat: Option<i64>,
    pub(crate) exp: Option<i64>,
    pub(crate) iss: Option<String>,
    #[serde(rename = "type")]
    pub(crate) kind: Option<TokenKind>,
}

impl RawClaims {
    /// Check each required claim, naming the first one that is absent or wrong
    pub(crate) fn into_claims(self) -> Result<TokenClaims, AuthError> {
        let sub = self
            .sub
            .filter(|sub| !sub.trim().is_empty())
            .ok_or(AuthError::MissingClaim("sub"))?;
        let iat = self.iat.ok_or(AuthError::MissingClaim("iat"))?;
        let exp = self.exp.ok_or(AuthError::MissingClaim("exp"))?;
        let iss = self
            .iss
            .filter(|iss| iss == ISSUER)
            .ok_or(AuthError::MissingClaim("iss"))?;
        let kind = self.kind.ok_or(AuthError::MissingClaim("type"))?;

        Ok(TokenClaims {
            sub,
            iat,
            exp,
            iss,
            kind,
        })
    }
}
