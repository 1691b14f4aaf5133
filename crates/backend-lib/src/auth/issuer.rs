//! Signed token issuance.
use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use metrics::counter;
use tracing::debug;

use sentinel_common::TokenKind;

use super::claims::TokenClaims;
use super::keys::SigningKey;
use crate::clock::{seconds, Clock};
use crate::config::TokenSettings;
use crate::error::AuthError;
use crate::metrics::TOKEN_ISSUED;

/// Mints HS256-signed access and refresh tokens.
///
/// Stateless apart from the immutable key, so clones can be used from any task.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    header: Header,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Fails with [`AuthError::Config`] unless both lifetimes are positive
    pub fn new(
        key: &SigningKey,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        if access_ttl <= Duration::zero() || refresh_ttl <= Duration::zero() {
            return Err(AuthError::Config(format!(
                "token lifetimes must be positive, got access {access_ttl} and refresh {refresh_ttl}"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            header: Header::new(Algorithm::HS256),
            access_ttl,
            refresh_ttl,
            clock,
        })
    }

    /// Build from configuration. A missing or short key is a fatal [`AuthError::Config`].
    pub fn from_settings(settings: &TokenSettings, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let key = SigningKey::from_config(settings.signing_key.as_deref())?;
        settings.validate()?;
        Self::new(
            &key,
            seconds(settings.access_ttl_secs),
            seconds(settings.refresh_ttl_secs),
            clock,
        )
    }

    pub fn issue_access_token(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, TokenKind::Refresh)
    }

    /// Sign a token of `kind` for `subject`, valid from now for the kind's TTL
    pub fn issue(&self, subject: &str, kind: TokenKind) -> Result<String, AuthError> {
        if subject.trim().is_empty() {
            return Err(AuthError::MissingClaim("sub"));
        }
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = TokenClaims::new(subject, kind, self.clock.now(), ttl);

        let token = encode(&self.header, &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))?;

        debug!(subject, %kind, exp = claims.exp, "issued token");
        counter!(TOKEN_ISSUED, "kind" => kind.as_str()).increment(1);
        Ok(token)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}
