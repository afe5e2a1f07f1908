//! Auth orchestration: login, authorize, revoke, refresh.
//!
//! Wires the directory collaborator, password hasher, token codec, and
//! revocation registry into the session state machine:
//! `Unauthenticated -> Authenticated -> (Active | Revoked | Expired)`.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Map;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::directory::UserDirectory;
use crate::error::{AuthError, Result};
use crate::keys::KeyRing;
use crate::password::PasswordHasher;
use crate::revocation::RevocationRegistry;
use crate::token::{Claims, IssuedToken, TokenCodec};

/// Credential issuance and verification service.
///
/// Stateless apart from the revocation registry; safe to share behind an
/// `Arc` and call from any number of tasks.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    hasher: PasswordHasher,
    codec: TokenCodec,
    revocations: RevocationRegistry,
    access_ttl: Duration,
    revoke_on_refresh: bool,
    decoy_hash: String,
}

impl AuthService {
    /// Build a service from validated configuration, a key ring, and a
    /// directory collaborator.
    pub fn new(
        config: &AuthConfig,
        keys: Arc<KeyRing>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        config.validate()?;

        let hasher = PasswordHasher::new(&config.hashing)?;
        let codec = TokenCodec::new(
            keys,
            &config.signing_algorithm,
            config.clock_skew_leeway_secs,
        )?;

        // Hashed once at construction; login verifies unknown identifiers
        // against this so a directory miss costs the same as a mismatch.
        let decoy: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let decoy_hash = hasher.hash(&decoy)?;

        Ok(Self {
            directory,
            hasher,
            codec,
            revocations: RevocationRegistry::new(),
            access_ttl: Duration::seconds(config.access_ttl_secs as i64),
            revoke_on_refresh: config.revoke_on_refresh,
            decoy_hash,
        })
    }

    /// Verify credentials and mint a token for the identity.
    ///
    /// Unknown identifier, wrong password, and inactive account all fail
    /// with `InvalidCredentials`. The caller learns nothing about which
    /// check failed, and every path runs one full hash verification.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<IssuedToken> {
        let identity = self.directory.lookup(identifier).await?;

        let stored_hash = identity
            .as_ref()
            .map(|id| id.password_hash.as_str())
            .unwrap_or(self.decoy_hash.as_str());
        let credentials_match = self.hasher.verify(secret, stored_hash)?;

        match identity {
            Some(id) if credentials_match && id.active => {
                let issued = self
                    .codec
                    .issue(&id.subject, Map::new(), self.access_ttl)
                    .await?;
                info!(subject = %id.subject, jti = %issued.claims.jti, "login succeeded");
                Ok(issued)
            }
            _ => {
                warn!(subject = %identifier, "login rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Verify a presented token and return its claims.
    ///
    /// Decode failures propagate as typed errors; a decoded token is then
    /// checked against the revocation registry (`Revoked`) and the
    /// directory's current view of the account (`InactiveAccount`, also
    /// reported when the identity no longer exists).
    pub async fn authorize(&self, token: &str) -> Result<Claims> {
        let claims = self.codec.decode(token).await?;

        if self.revocations.is_revoked(&claims.jti)
            || self.revocations.is_subject_revoked(&claims.sub, claims.iat)
        {
            return Err(AuthError::Revoked);
        }

        match self.directory.lookup(&claims.sub).await? {
            Some(identity) if identity.active => Ok(claims),
            _ => Err(AuthError::InactiveAccount),
        }
    }

    /// Revoke a single token until its natural expiry.
    ///
    /// The token must still decode: revoking garbage or a tampered token
    /// is a typed failure, and an already-expired token reports `Expired`
    /// (it needs no registry entry). Revoking twice is idempotent.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let claims = self.codec.decode(token).await?;
        self.revocations.revoke(&claims.jti, claims.exp);
        Ok(())
    }

    /// Exchange a still-valid token for a fresh one.
    ///
    /// Equivalent to authorize followed by re-issuance: new `jti`, new
    /// expiry, same subject and custom claims. When `revoke_on_refresh`
    /// is set (the default) the old token id is registered as revoked, so
    /// each token can be traded in once.
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken> {
        let claims = self.authorize(token).await?;

        let issued = self
            .codec
            .issue(&claims.sub, claims.custom.clone(), self.access_ttl)
            .await?;
        if self.revoke_on_refresh {
            self.revocations.revoke(&claims.jti, claims.exp);
        }
        info!(
            subject = %claims.sub,
            old_jti = %claims.jti,
            new_jti = %issued.claims.jti,
            "token refreshed"
        );
        Ok(issued)
    }

    /// Revoke every outstanding token for an identity (password change,
    /// forced logout). Tokens issued from now on are unaffected.
    pub fn revoke_all(&self, identifier: &str) {
        let now = Utc::now().timestamp();
        self.revocations
            .revoke_subject(identifier, now, now + self.access_ttl.num_seconds());
    }

    /// Drop revocation entries whose tokens have expired; returns how
    /// many were purged. Optional maintenance; correctness never depends
    /// on it.
    pub fn sweep_revocations(&self) -> usize {
        self.revocations.sweep(Utc::now().timestamp())
    }
}
