//! Configuration for the credential core.
//!
//! Settings load from environment variables with development-friendly
//! defaults; every recognized option has an `AUTH_*` variable. Parse
//! failures surface with context rather than panicking.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::AuthError;
use crate::keys::parse_algorithm;

const DEFAULT_ACCESS_TTL_SECS: u64 = 1800;
const DEFAULT_LEEWAY_SECS: u64 = 60;
const DEFAULT_RETAINED_KEYS: usize = 3;

/// Core settings: signing scheme, token lifetime, and hashing cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Signing scheme: `HS256`, `HS384`, `HS512`, or `RS256`.
    pub signing_algorithm: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: u64,
    /// Clock-skew tolerance applied to expiry and issued-at checks.
    pub clock_skew_leeway_secs: u64,
    /// Register the old token id as revoked when a token is refreshed.
    pub revoke_on_refresh: bool,
    /// Prior signing keys kept for verification after rotation.
    pub retained_keys: usize,
    pub hashing: HashingSettings,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingSettings {
    fn default() -> Self {
        // Argon2 crate defaults (19 MiB, 2 passes, 1 lane).
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: env::var("AUTH_HASH_MEMORY_KIB")
                .unwrap_or_else(|_| defaults.memory_kib.to_string())
                .parse()
                .context("Invalid AUTH_HASH_MEMORY_KIB")?,
            iterations: env::var("AUTH_HASH_ITERATIONS")
                .unwrap_or_else(|_| defaults.iterations.to_string())
                .parse()
                .context("Invalid AUTH_HASH_ITERATIONS")?,
            parallelism: env::var("AUTH_HASH_PARALLELISM")
                .unwrap_or_else(|_| defaults.parallelism.to_string())
                .parse()
                .context("Invalid AUTH_HASH_PARALLELISM")?,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_algorithm: "HS256".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            clock_skew_leeway_secs: DEFAULT_LEEWAY_SECS,
            revoke_on_refresh: true,
            retained_keys: DEFAULT_RETAINED_KEYS,
            hashing: HashingSettings::default(),
        }
    }
}

impl AuthConfig {
    /// Load settings from `AUTH_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            signing_algorithm: env::var("AUTH_SIGNING_ALGORITHM")
                .unwrap_or(defaults.signing_algorithm),
            access_ttl_secs: env::var("AUTH_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| defaults.access_ttl_secs.to_string())
                .parse()
                .context("Invalid AUTH_ACCESS_TTL_SECS")?,
            clock_skew_leeway_secs: env::var("AUTH_CLOCK_SKEW_LEEWAY_SECS")
                .unwrap_or_else(|_| defaults.clock_skew_leeway_secs.to_string())
                .parse()
                .context("Invalid AUTH_CLOCK_SKEW_LEEWAY_SECS")?,
            revoke_on_refresh: env::var("AUTH_REVOKE_ON_REFRESH")
                .unwrap_or_else(|_| defaults.revoke_on_refresh.to_string())
                .parse()
                .context("Invalid AUTH_REVOKE_ON_REFRESH")?,
            retained_keys: env::var("AUTH_RETAINED_KEYS")
                .unwrap_or_else(|_| defaults.retained_keys.to_string())
                .parse()
                .context("Invalid AUTH_RETAINED_KEYS")?,
            hashing: HashingSettings::from_env()?,
        })
    }

    /// Reject settings no component could run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        parse_algorithm(&self.signing_algorithm)?;
        if self.access_ttl_secs == 0 {
            return Err(AuthError::Configuration(
                "AUTH_ACCESS_TTL_SECS must be at least 1".into(),
            ));
        }
        if self.hashing.parallelism == 0 || self.hashing.iterations == 0 {
            return Err(AuthError::Configuration(
                "hashing iterations and parallelism must be at least 1".into(),
            ));
        }
        if self.hashing.memory_kib < 8 * self.hashing.parallelism {
            return Err(AuthError::Configuration(
                "hashing memory must be at least 8 KiB per lane".into(),
            ));
        }
        Ok(())
    }
}
