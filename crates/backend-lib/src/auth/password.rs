// ============================
// sentinel-auth/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Records are PHC strings (`$argon2id$...` or `$scrypt$...`) carrying their own
//! salt and cost parameters, so [`PasswordHasher::verify`] accepts records made
//! under either scheme regardless of which one is currently configured. Legacy
//! bcrypt records are accepted by `verify` but never produced.
use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use rand::RngCore;
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Params as ScryptParams, Scrypt,
};
use zeroize::Zeroizing;

use crate::config::{HashAlgorithm, PasswordSettings};
use crate::error::AuthError;

/// Salt length in bytes
const SALT_BYTES: usize = 16;

/// Derived key length for scrypt
const SCRYPT_OUTPUT_LEN: usize = 32;

#[derive(Clone)]
enum Scheme {
    Argon2(Argon2<'static>),
    Scrypt(ScryptParams),
}

/// Salted one-way password hashing with a fixed, configured work factor
#[derive(Clone)]
pub struct PasswordHasher {
    scheme: Scheme,
    /// Record hashed at the configured cost, used to burn equal time for unknown users
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.scheme {
            Scheme::Argon2(_) => "argon2id",
            Scheme::Scrypt(_) => "scrypt",
        };
        f.debug_struct("PasswordHasher").field("scheme", &scheme).finish()
    }
}

impl PasswordHasher {
    /// Build a hasher for the configured scheme and cost.
    ///
    /// Fails with [`AuthError::Config`] when the parameters are out of range.
    pub fn new(settings: &PasswordSettings) -> Result<Self, AuthError> {
        let scheme = Self::scheme(settings)?;

        let mut decoy = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(decoy.as_mut_slice());
        let dummy_hash = hash_with(&scheme, decoy.as_slice())?;

        Ok(Self { scheme, dummy_hash })
    }

    /// Validate parameters without paying for a hash
    pub fn check_params(settings: &PasswordSettings) -> Result<(), AuthError> {
        Self::scheme(settings).map(|_| ())
    }

    fn scheme(settings: &PasswordSettings) -> Result<Scheme, AuthError> {
        match settings.algorithm {
            HashAlgorithm::Argon2id => {
                let params = Argon2Params::new(
                    settings.memory_kib,
                    settings.iterations,
                    settings.parallelism,
                    None,
                )
                .map_err(|e| AuthError::Config(format!("invalid argon2 parameters: {e}")))?;
                Ok(Scheme::Argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params)))
            },
            HashAlgorithm::Scrypt => {
                let params = ScryptParams::new(
                    settings.scrypt_log_n,
                    settings.scrypt_r,
                    settings.scrypt_p,
                    SCRYPT_OUTPUT_LEN,
                )
                .map_err(|e| AuthError::Config(format!("invalid scrypt parameters: {e}")))?;
                Ok(Scheme::Scrypt(params))
            },
        }
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        hash_with(&self.scheme, password.as_bytes())
    }

    /// Verify a password against a stored record.
    ///
    /// Malformed, empty or unknown-scheme records yield `false`. The digest
    /// comparison is constant time.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if hash.is_empty() {
            return false;
        }
        if is_bcrypt_record(hash) {
            return bcrypt::verify(password, hash).unwrap_or(false);
        }
        let parsed = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        match parsed.algorithm.as_str() {
            "argon2id" | "argon2i" | "argon2d" => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            "scrypt" => Scrypt.verify_password(password.as_bytes(), &parsed).is_ok(),
            _ => false,
        }
    }

    /// Spend the same effort as a real verification, then fail.
    ///
    /// Called when no credential record exists for the identifier. The decoy
    /// is hashed under the configured scheme and cost, so timing only matches
    /// records made under that configuration. Records still under another
    /// scheme (older scrypt or bcrypt hashes) verify at their own cost until
    /// they are rehashed.
    pub fn dummy_verify(&self, password: &str) -> bool {
        std::hint::black_box(self.verify(password, &self.dummy_hash));
        false
    }
}

/// Legacy bcrypt records (`$2a$`, `$2b$`, `$2y$`) are verify-only
fn is_bcrypt_record(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}

fn hash_with(scheme: &Scheme, password: &[u8]) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Internal(format!("salt encoding failed: {e}")))?;

    let hash = match scheme {
        Scheme::Argon2(argon2) => argon2.hash_password(password, &salt),
        Scheme::Scrypt(params) => {
            Scrypt.hash_password_customized(password, None, None, *params, &salt)
        },
    }
    .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?;

    Ok(hash.to_string())
}

#[cfg(test)]
pub(crate) fn fast_settings(algorithm: HashAlgorithm) -> PasswordSettings {
    PasswordSettings {
        algorithm,
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
        scrypt_log_n: 4,
        scrypt_r: 8,
        scrypt_p: 1,
    }
}
