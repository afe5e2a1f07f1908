//! Claims model and token codec.
//!
//! Tokens are standard three-part JWTs (header.payload.signature,
//! base64url) signed with the key ring's active key. The codec pins a
//! single configured algorithm: a token declaring anything else is
//! rejected before any key material is consulted, which closes the
//! algorithm-confusion downgrade where a token claims a weaker scheme
//! than the server trusts.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::keys::{parse_algorithm, KeyRing, SigningKey};

/// Claim keys the codec owns; they cannot be supplied as custom claims.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", "jti"];

/// Token payload: reserved claims plus an open extension map.
///
/// Custom claims are flattened into the payload alongside the reserved
/// keys, so the wire shape is a flat JWT claims object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier.
    pub sub: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds); always strictly greater than `iat`.
    pub exp: i64,
    /// Unique token id (v4 UUID).
    pub jti: String,
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

/// A freshly minted token: serialized form plus the structured claims.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    /// Seconds until expiry at issuance time.
    pub expires_in: i64,
}

/// Signs and verifies tokens against a [`KeyRing`].
pub struct TokenCodec {
    keys: Arc<KeyRing>,
    algorithm: Algorithm,
    leeway_secs: u64,
}

impl TokenCodec {
    pub fn new(keys: Arc<KeyRing>, algorithm: &str, leeway_secs: u64) -> Result<Self> {
        Ok(Self {
            keys,
            algorithm: parse_algorithm(algorithm)?,
            leeway_secs,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Mint a signed token for `subject` with the given custom claims.
    ///
    /// Sets `iat = now`, `exp = now + ttl`, and a fresh v4-UUID `jti`; the
    /// header carries the active key's algorithm and key id. A TTL under
    /// one second or a custom claim shadowing a reserved key fails with
    /// `Validation`.
    pub async fn issue(
        &self,
        subject: &str,
        custom: Map<String, Value>,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        if subject.is_empty() {
            return Err(AuthError::Validation("subject must not be empty".into()));
        }
        if ttl.num_seconds() < 1 {
            return Err(AuthError::Validation(
                "token ttl must be at least one second".into(),
            ));
        }
        for key in RESERVED_CLAIMS {
            if custom.contains_key(key) {
                return Err(AuthError::Validation(format!("reserved claim key: {key}")));
            }
        }

        let key = self.keys.active().await;
        if key.algorithm() != self.algorithm {
            return Err(AuthError::Configuration(format!(
                "active key algorithm {:?} does not match configured {:?}",
                key.algorithm(),
                self.algorithm
            )));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            custom,
        };

        let mut header = Header::new(self.algorithm);
        header.kid = Some(key.kid().to_owned());
        let token = encode(&header, &claims, key.encoding())?;
        let expires_in = claims.exp - claims.iat;

        Ok(IssuedToken {
            token,
            claims,
            expires_in,
        })
    }

    /// Decode and verify a serialized token.
    ///
    /// Order of checks: structure (`MalformedToken`), declared algorithm
    /// (`AlgorithmMismatch`), signature against active then retained keys
    /// (`InvalidSignature`), expiry with leeway (`Expired`), issued-at not
    /// in the future beyond leeway (`NotYetValid`). A key yielding a
    /// verdict other than a signature mismatch is authoritative: its
    /// signature matched, so no further keys are tried.
    pub async fn decode(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token)?;
        if header.alg != self.algorithm {
            return Err(AuthError::AlgorithmMismatch(format!(
                "expected {:?}, token declares {:?}",
                self.algorithm, header.alg
            )));
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;

        let keys = self.keys.verification_keys().await;
        let candidates = self.ordered_candidates(&keys, header.kid.as_deref());

        for key in &candidates {
            match decode::<Claims>(token, key.decoding(), &validation) {
                Ok(data) => {
                    self.validate_claims(&data.claims)?;
                    if !Arc::ptr_eq(key, &keys[0]) {
                        warn!(kid = %key.kid(), "token verified with retired signing key");
                    }
                    return Ok(data.claims);
                }
                Err(e) => match AuthError::from(e) {
                    AuthError::InvalidSignature => continue,
                    other => return Err(other),
                },
            }
        }

        Err(AuthError::InvalidSignature)
    }

    /// Verification order: kid-matched keys first, then the rest as the
    /// ring orders them (active, then retained newest to oldest).
    fn ordered_candidates(
        &self,
        keys: &[Arc<SigningKey>],
        kid: Option<&str>,
    ) -> Vec<Arc<SigningKey>> {
        let mut ordered = Vec::with_capacity(keys.len());
        if let Some(kid) = kid {
            for key in keys {
                if key.kid() == kid {
                    ordered.push(Arc::clone(key));
                }
            }
        }
        for key in keys {
            if !ordered.iter().any(|seen| Arc::ptr_eq(seen, key)) {
                ordered.push(Arc::clone(key));
            }
        }
        ordered
    }

    fn validate_claims(&self, claims: &Claims) -> Result<()> {
        if claims.jti.trim().is_empty() {
            return Err(AuthError::MalformedToken("empty jti claim".into()));
        }
        let now = Utc::now().timestamp();
        if claims.iat > now + self.leeway_secs as i64 {
            return Err(AuthError::NotYetValid);
        }
        Ok(())
    }
}
