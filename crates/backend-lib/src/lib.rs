// ============================
// sentinel-auth/src/lib.rs
// ============================
//! Credential authentication and session tokens for the `Sentinel` backend.
//!
//! Password verification, signed access/refresh tokens and per-client login
//! throttling. HTTP routing and user persistence live elsewhere; users are read
//! through the [`auth::UserStore`] trait.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;

pub use auth::{
    bearer_token, AuthenticationService, CredentialRecord, InMemoryUserStore, PasswordHasher,
    RateDecision, RateLimiter, SigningKey, TokenClaims, TokenIssuer, TokenVerifier, UserStore,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use error::AuthError;
pub use sentinel_common::{LoginResponse, RefreshResponse, TokenKind, TokenType};
