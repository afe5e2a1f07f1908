//! Signing key material and rotation.
//!
//! A [`SigningKey`] pairs an algorithm with encoding/decoding key material
//! under a stable key id. The [`KeyRing`] holds the active key plus a
//! bounded list of retained prior keys so that tokens signed before a
//! rotation keep verifying until they expire.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::{rngs::OsRng, RngCore};
use tokio::sync::RwLock;
use tracing::info;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

pub use jsonwebtoken::Algorithm;

const MIN_HMAC_SECRET_LEN: usize = 32;
const MIN_SECRET_ENTROPY_BITS: f64 = 4.0;

/// Parse a configured algorithm name into the signing scheme it denotes.
pub fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        "RS256" => Ok(Algorithm::RS256),
        other => Err(AuthError::Configuration(format!(
            "unsupported signing algorithm: {other}"
        ))),
    }
}

/// Strength classification for symmetric signing secrets.
#[derive(Debug, PartialEq, Eq)]
pub enum SecretStrength {
    Weak,
    Acceptable,
    Strong,
}

/// Classify a symmetric secret: length, Shannon entropy, trivial patterns.
pub fn secret_strength(secret: &[u8]) -> SecretStrength {
    if secret.len() < MIN_HMAC_SECRET_LEN {
        return SecretStrength::Weak;
    }
    let entropy = shannon_entropy(secret);
    if entropy < MIN_SECRET_ENTROPY_BITS || has_trivial_patterns(secret) {
        return SecretStrength::Weak;
    }
    if secret.len() >= 2 * MIN_HMAC_SECRET_LEN && entropy >= 5.0 {
        SecretStrength::Strong
    } else {
        SecretStrength::Acceptable
    }
}

/// Shannon entropy in bits per byte (0-8 scale).
fn shannon_entropy(data: &[u8]) -> f64 {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    let len = data.len() as f64;
    let mut entropy = 0.0;
    for &count in freq.iter() {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }
    entropy
}

/// Runs of a repeated byte or ascending sequences of four or more.
fn has_trivial_patterns(data: &[u8]) -> bool {
    let mut same = 1;
    let mut ascending = 1;
    for window in data.windows(2) {
        same = if window[0] == window[1] { same + 1 } else { 1 };
        ascending = if window[1] as i16 - window[0] as i16 == 1 {
            ascending + 1
        } else {
            1
        };
        if same >= 4 || ascending >= 4 {
            return true;
        }
    }
    false
}

/// Generate a random symmetric secret of `len` bytes.
///
/// The buffer is zeroed when the caller drops it.
pub fn generate_hmac_secret(len: usize) -> Result<Zeroizing<Vec<u8>>> {
    if len < MIN_HMAC_SECRET_LEN {
        return Err(AuthError::Configuration(format!(
            "signing secret must be at least {MIN_HMAC_SECRET_LEN} bytes"
        )));
    }
    let mut buffer = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(&mut buffer);
    Ok(buffer)
}

/// A signing key: algorithm, key id, and encoding/decoding material.
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Build a symmetric key for an HS* algorithm.
    ///
    /// Weak secrets (short, low-entropy, or trivially patterned) are
    /// rejected at construction so they never sign anything.
    pub fn from_hmac_secret(
        kid: impl Into<String>,
        algorithm: Algorithm,
        secret: &[u8],
    ) -> Result<Self> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Configuration(format!(
                "{algorithm:?} does not take a symmetric secret"
            )));
        }
        if secret_strength(secret) == SecretStrength::Weak {
            return Err(AuthError::Configuration(
                "signing secret is too weak (need 32+ high-entropy bytes)".into(),
            ));
        }
        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// Build an RS256 key pair from PEM-encoded RSA keys.
    pub fn from_rsa_pem(
        kid: impl Into<String>,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<Self> {
        let encoding = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid RSA private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::Configuration(format!("invalid RSA public key: {e}")))?;
        Ok(Self {
            kid: kid.into(),
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of Debug output.
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Active signing key plus retained prior keys.
///
/// Read-mostly: issuance and verification take a read lock and clone an
/// `Arc`; rotation takes the write locks briefly to swap the active key.
pub struct KeyRing {
    active: RwLock<Arc<SigningKey>>,
    retired: RwLock<Vec<Arc<SigningKey>>>,
    max_retired: usize,
}

impl KeyRing {
    pub fn new(initial: SigningKey, max_retired: usize) -> Self {
        Self {
            active: RwLock::new(Arc::new(initial)),
            retired: RwLock::new(Vec::new()),
            max_retired,
        }
    }

    /// Replace the active key, retaining the previous one for verification.
    ///
    /// The retained list is capped at `max_retired`; the oldest key drops
    /// off, after which tokens it signed stop verifying. The new key must
    /// use the same algorithm as the active one; changing the scheme is a
    /// reconfiguration, not a rotation.
    pub async fn rotate(&self, next: SigningKey) -> Result<()> {
        let mut active = self.active.write().await;
        if next.algorithm != active.algorithm {
            return Err(AuthError::Configuration(format!(
                "cannot rotate from {:?} to {:?}",
                active.algorithm, next.algorithm
            )));
        }
        let mut retired = self.retired.write().await;

        let previous = Arc::clone(&active);
        let old_kid = previous.kid.clone();
        retired.push(previous);
        if retired.len() > self.max_retired {
            retired.remove(0);
        }

        info!(old_kid = %old_kid, new_kid = %next.kid, "signing key rotated");
        *active = Arc::new(next);
        Ok(())
    }

    /// The key new tokens are signed with.
    pub async fn active(&self) -> Arc<SigningKey> {
        Arc::clone(&*self.active.read().await)
    }

    /// All keys trusted for verification: active first, then retained keys
    /// newest to oldest.
    pub async fn verification_keys(&self) -> Vec<Arc<SigningKey>> {
        let active = self.active.read().await;
        let retired = self.retired.read().await;
        let mut keys = Vec::with_capacity(1 + retired.len());
        keys.push(Arc::clone(&active));
        keys.extend(retired.iter().rev().cloned());
        keys
    }
}
