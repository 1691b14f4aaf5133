// ============================
// sentinel-auth/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod claims;
pub mod issuer;
pub mod keys;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod store;
pub mod verifier;

pub use claims::{TokenClaims, ISSUER};
pub use issuer::TokenIssuer;
pub use keys::{generate_signing_key, SigningKey, MIN_SIGNING_KEY_BYTES};
pub use password::PasswordHasher;
pub use rate_limit::{RateDecision, RateLimiter};
pub use service::{bearer_token, AuthenticationService};
pub use store::{CredentialRecord, InMemoryUserStore, UserStore};
pub use verifier::TokenVerifier;
