// ============================
// sentinel-auth/src/auth/service.rs
// ============================
//! Login, refresh and per-request authentication flows.
use std::sync::Arc;
use std::time::Duration as StdDuration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use sentinel_common::{LoginResponse, RefreshResponse, TokenKind, TokenType};

use super::claims::TokenClaims;
use super::keys::SigningKey;
use super::password::PasswordHasher;
use super::rate_limit::{RateDecision, RateLimiter};
use super::store::UserStore;
use super::{TokenIssuer, TokenVerifier};
use crate::clock::{seconds, Clock, SystemClock};
use crate::config::{RateLimitSettings, Settings};
use crate::error::AuthError;
use crate::metrics::{LOGIN_FAILED, LOGIN_RATE_LIMITED, LOGIN_SUCCEEDED, REFRESH_SUCCEEDED};

/// Orchestrates the rate limiter, user store, password hasher and token
/// issuer/verifier.
///
/// Every collaborator is injected; the only mutable shared state is inside the
/// [`RateLimiter`].
pub struct AuthenticationService {
    store: Arc<dyn UserStore>,
    hasher: Arc<PasswordHasher>,
    limiter: Arc<RateLimiter>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    /// Period of the idle-key sweep started by [`Self::start_sweeper`]
    sweep_interval: StdDuration,
}

impl AuthenticationService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<PasswordHasher>,
        limiter: Arc<RateLimiter>,
        issuer: TokenIssuer,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            store,
            hasher,
            limiter,
            issuer,
            verifier,
            sweep_interval: StdDuration::from_secs(RateLimitSettings::default().sweep_interval_secs),
        }
    }

    /// Override how often idle rate-limit keys are swept
    pub fn with_sweep_interval(mut self, interval: StdDuration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Wire every component from validated settings, reading the system clock
    pub fn from_settings(settings: &Settings, store: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        Self::with_clock(settings, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: &Settings,
        store: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        settings.validate()?;

        let key = SigningKey::from_config(settings.tokens.signing_key.as_deref())?;
        let issuer = TokenIssuer::new(
            &key,
            seconds(settings.tokens.access_ttl_secs),
            seconds(settings.tokens.refresh_ttl_secs),
            clock.clone(),
        )?;
        let verifier = TokenVerifier::new(&key, clock.clone());
        let hasher = Arc::new(PasswordHasher::new(&settings.password)?);
        let limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit, clock));

        Ok(Self::new(store, hasher, limiter, issuer, verifier)
            .with_sweep_interval(StdDuration::from_secs(settings.rate_limit.sweep_interval_secs)))
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Start the periodic sweep of idle rate-limit keys.
    ///
    /// Call once at startup from inside the tokio runtime. The task ends on its
    /// own once the service and its limiter are dropped.
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        info!(interval_secs = self.sweep_interval.as_secs(), "starting rate limit sweeper");
        self.limiter.spawn_sweeper(self.sweep_interval)
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authenticate `identifier`/`password` on behalf of `client_key`.
    ///
    /// Every attempt that gets past the rate limiter counts against it,
    /// whether or not the password turns out to be right. Unknown identifiers
    /// pay for a decoy verification so they cost the same as a wrong password.
    pub async fn login(
        &self,
        client_key: &str,
        identifier: &str,
        password: &str,
    ) -> Result<LoginResponse, AuthError> {
        if let RateDecision::Denied { retry_after_secs } = self.limiter.acquire(client_key) {
            warn!(client_key, retry_after_secs, "login throttled");
            counter!(LOGIN_RATE_LIMITED).increment(1);
            return Err(AuthError::RateLimited { retry_after_secs });
        }

        let record = self
            .store
            .get_by_identifier(identifier)
            .await
            .map_err(|err| {
                error!(client_key, error = %err, "user store lookup failed");
                AuthError::UpstreamFailure(err.to_string())
            })?;

        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        let verified = match record {
            Some(record) => {
                let hash = record.password_hash.clone();
                let matches =
                    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash)).await?;
                matches.then_some(record)
            },
            None => {
                tokio::task::spawn_blocking(move || hasher.dummy_verify(&password)).await?;
                None
            },
        };

        let Some(record) = verified else {
            info!(client_key, "login rejected");
            counter!(LOGIN_FAILED).increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        let access_token = self.issuer.issue_access_token(&record.id)?;
        let refresh_token = self.issuer.issue_refresh_token(&record.id)?;

        info!(client_key, subject = %record.id, "login succeeded");
        counter!(LOGIN_SUCCEEDED).increment(1);
        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: TokenType::Bearer,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token stays valid until its own expiry.
    pub fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let claims = self.verifier.verify(refresh_token, TokenKind::Refresh)?;
        let access_token = self.issuer.issue_access_token(&claims.sub)?;

        info!(subject = %claims.sub, "access token refreshed");
        counter!(REFRESH_SUCCEEDED).increment(1);
        Ok(RefreshResponse {
            access_token,
            token_type: TokenType::Bearer,
        })
    }

    /// Validate the access token carried by an authenticated request
    pub fn authenticate(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        self.verifier.verify(access_token, TokenKind::Access)
    }

    /// Hash a new password for storage, off the async executor
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || hasher.hash(&password)).await?
    }
}

/// Extract the token from an `Authorization` header value of the form `Bearer <token>`
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
