// crates/backend-lib/src/error.rs

//! Central error type for the authentication core.
use sentinel_common::TokenKind;
use thiserror::Error;

/// Every way an authentication or token operation can be rejected.
///
/// Token-validation outcomes are ordinary values the caller branches on;
/// none of them indicate a bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad or missing configuration. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown identifier or wrong password; deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Token expired")]
    TokenExpired,

    /// Signature mismatch or a structurally corrupt token.
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token is missing required claim `{0}`")]
    MissingClaim(&'static str),

    #[error("Expected a {expected} token, got a {found} token")]
    WrongTokenKind { expected: TokenKind, found: TokenKind },

    /// The user store could not be reached. The detail is for logs only.
    #[error("Upstream failure")]
    UpstreamFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Config(_) => "CFG_001",
            AuthError::InvalidCredentials => "AUTH_001",
            AuthError::RateLimited { .. } => "AUTH_002",
            AuthError::UpstreamFailure(_) => "AUTH_003",
            AuthError::TokenExpired => "TOKEN_001",
            AuthError::InvalidSignature => "TOKEN_002",
            AuthError::MissingClaim(_) => "TOKEN_003",
            AuthError::WrongTokenKind { .. } => "TOKEN_004",
            AuthError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for returning to clients
    pub fn sanitized_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid username or password".to_string(),
            AuthError::RateLimited { .. } => {
                "Too many login attempts, please try again later".to_string()
            },
            AuthError::TokenExpired => "Token has expired".to_string(),
            AuthError::InvalidSignature
            | AuthError::MissingClaim(_)
            | AuthError::WrongTokenKind { .. } => "Invalid token".to_string(),
            AuthError::Config(_) | AuthError::UpstreamFailure(_) | AuthError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
        }
    }

    /// Seconds the client should wait before retrying, if throttled
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AuthError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Whether this error is one of the token-validation outcomes
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired
                | AuthError::InvalidSignature
                | AuthError::MissingClaim(_)
                | AuthError::WrongTokenKind { .. }
        )
    }
}

impl From<figment::Error> for AuthError {
    fn from(err: figment::Error) -> Self {
        AuthError::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("hashing worker failed: {err}"))
    }
}
