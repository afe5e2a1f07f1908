//! Password hashing and verification using Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, Error as HashError, PasswordHash, SaltString},
    Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version,
};

use crate::config::HashingSettings;
use crate::error::{AuthError, Result};

/// Argon2id hasher with a configured work factor.
///
/// Hashing draws a fresh random salt per call, so two hashes of the same
/// secret differ; verification re-derives the digest under the parameters
/// embedded in the stored PHC string and compares in constant time.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(settings: &HashingSettings) -> Result<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| AuthError::Configuration(format!("invalid hashing parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a secret into a PHC-formatted string safe for storage.
    ///
    /// Fails with `HashingFailure` only when the primitive itself errors
    /// (e.g. cannot allocate the configured memory).
    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::HashingFailure(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a secret against a stored PHC hash.
    ///
    /// A mismatch is an ordinary `Ok(false)`, never an error. An
    /// unparseable stored hash is a `HashingFailure`: the stored record is
    /// corrupt, not a wrong guess by the caller.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AuthError::HashingFailure(format!("stored hash unparseable: {e}")))?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AuthError::HashingFailure(e.to_string())),
        }
    }
}
