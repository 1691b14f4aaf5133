// =======================
// crates/common/src/lib.rs
// =======================
//! Common types and structures
//! used for communication between the HTTP boundary and the `Sentinel` auth core.
//! This module defines the login/refresh request and response bodies and the
//! token kind carried inside every signed token.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which flow a signed token belongs to.
///
/// Serialized into the token payload as the `type` claim.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token presented on every authenticated request
    Access,
    /// Long-lived token used only to obtain new access tokens
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token kind `{other}`")),
        }
    }
}

/// Scheme reported to clients alongside issued tokens
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[default]
    Bearer,
}

/// Body of a login request
/// # Fields
/// * `identifier` - Username or email of the account
/// * `password` - Plain password, never stored or logged
#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a refresh request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful login result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: TokenType,
}

/// Successful refresh result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: TokenType,
}
