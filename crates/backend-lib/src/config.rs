// ============================
// sentinel-auth/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::keys::MIN_SIGNING_KEY_BYTES;
use crate::error::AuthError;

/// Default config file looked up by [`Settings::load`]
pub const DEFAULT_CONFIG_FILE: &str = "sentinel.toml";

/// Prefix for environment overrides, e.g. `SENTINEL_TOKENS__SIGNING_KEY`
pub const ENV_PREFIX: &str = "SENTINEL_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Token signing and lifetimes
    pub tokens: TokenSettings,
    /// Login throttling
    pub rate_limit: RateLimitSettings,
    /// Password hashing work factor
    pub password: PasswordSettings,
}

/// Token signing key and lifetimes
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Shared HMAC secret, at least 32 bytes
    pub signing_key: Option<String>,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
}

/// Sliding-window login throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Attempts allowed per key inside one window
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_secs: u64,
    /// How often idle keys are swept, in seconds
    pub sweep_interval_secs: u64,
}

/// Hashing scheme for new password records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Argon2id,
    Scrypt,
}

/// Password hashing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub algorithm: HashAlgorithm,
    /// Argon2 memory cost in KiB
    pub memory_kib: u32,
    /// Argon2 iterations
    pub iterations: u32,
    /// Argon2 lanes
    pub parallelism: u32,
    /// scrypt CPU/memory cost as log2(N)
    pub scrypt_log_n: u8,
    /// scrypt block size
    pub scrypt_r: u32,
    /// scrypt parallelization
    pub scrypt_p: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tokens: TokenSettings::default(),
            rate_limit: RateLimitSettings::default(),
            password: PasswordSettings::default(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            signing_key: None,
            access_ttl_secs: 30 * 60,             // 30 minutes
            refresh_ttl_secs: 7 * 24 * 60 * 60,  // 7 days
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 60,
            sweep_interval_secs: 5 * 60,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        // OWASP minimums for Argon2id; scrypt values match its recommended params
        Self {
            algorithm: HashAlgorithm::Argon2id,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            scrypt_log_n: 17,
            scrypt_r: 8,
            scrypt_p: 1,
        }
    }
}

impl Settings {
    /// Load settings from `sentinel.toml` (if present) and `SENTINEL_` env vars
    pub fn load() -> Result<Self, AuthError> {
        Self::extract(Self::figment().merge(Toml::file(DEFAULT_CONFIG_FILE)))
    }

    /// Load settings from an explicit TOML file, still honoring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AuthError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        Self::extract(Self::figment().merge(Toml::file(path)))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    fn extract(figment: Figment) -> Result<Self, AuthError> {
        let settings: Settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every value that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<(), AuthError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AuthError::Config(format!(
                "invalid log level `{}`",
                self.log_level
            )));
        }
        self.tokens.validate()?;
        self.rate_limit.validate()?;
        self.password.validate()
    }
}

impl TokenSettings {
    pub fn validate(&self) -> Result<(), AuthError> {
        match &self.signing_key {
            None => return Err(AuthError::Config("signing key is not set".to_string())),
            Some(key) if key.len() < MIN_SIGNING_KEY_BYTES => {
                return Err(AuthError::Config(format!(
                    "signing key must be at least {MIN_SIGNING_KEY_BYTES} bytes"
                )));
            },
            Some(_) => {},
        }
        if self.access_ttl_secs == 0 {
            return Err(AuthError::Config("access token TTL must be positive".to_string()));
        }
        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(AuthError::Config(
                "refresh token TTL must be longer than access token TTL".to_string(),
            ));
        }
        Ok(())
    }
}

impl RateLimitSettings {
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.max_attempts == 0 {
            return Err(AuthError::Config("rate limit must allow at least one attempt".to_string()));
        }
        if self.window_secs == 0 {
            return Err(AuthError::Config("rate limit window must be positive".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(AuthError::Config("sweep interval must be positive".to_string()));
        }
        Ok(())
    }
}

impl PasswordSettings {
    pub fn validate(&self) -> Result<(), AuthError> {
        crate::auth::password::PasswordHasher::check_params(self)
    }
}
