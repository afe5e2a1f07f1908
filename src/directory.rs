//! User directory collaborator.
//!
//! The core never stores identities; it reads them through this interface.
//! Production deployments implement [`UserDirectory`] over their user
//! store; [`InMemoryDirectory`] serves tests and embedded use.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthError, Result};

/// An identity record as the directory stores it.
///
/// `password_hash` is an opaque PHC string produced by
/// [`crate::password::PasswordHasher::hash`]; the plaintext secret never
/// appears here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub subject: String,
    pub password_hash: String,
    pub active: bool,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// External user-directory collaborator.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch an identity by its unique identifier; `None` when absent.
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredIdentity>>;

    /// Deactivate an identity.
    async fn mark_inactive(&self, identifier: &str) -> Result<()>;
}

/// Directory backed by a concurrent in-process map.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    identities: DashMap<String, StoredIdentity>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an identity, keyed by its subject.
    pub fn upsert(&self, identity: StoredIdentity) {
        self.identities.insert(identity.subject.clone(), identity);
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredIdentity>> {
        Ok(self.identities.get(identifier).map(|entry| entry.clone()))
    }

    async fn mark_inactive(&self, identifier: &str) -> Result<()> {
        match self.identities.get_mut(identifier) {
            Some(mut entry) => {
                entry.active = false;
                Ok(())
            }
            None => Err(AuthError::Directory(format!(
                "unknown identifier: {identifier}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(subject: &str, active: bool) -> StoredIdentity {
        StoredIdentity {
            subject: subject.to_owned(),
            password_hash: "$argon2id$stub".to_owned(),
            active,
            attributes: Map::new(),
        }
    }

    #[tokio::test]
    async fn lookup_returns_none_for_unknown() {
        let directory = InMemoryDirectory::new();
        assert!(directory.lookup("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_lookup() {
        let directory = InMemoryDirectory::new();
        directory.upsert(identity("alice", true));

        let found = directory.lookup("alice").await.unwrap().unwrap();
        assert_eq!(found.subject, "alice");
        assert!(found.active);
    }

    #[tokio::test]
    async fn mark_inactive_flips_the_flag() {
        let directory = InMemoryDirectory::new();
        directory.upsert(identity("alice", true));

        directory.mark_inactive("alice").await.unwrap();
        let found = directory.lookup("alice").await.unwrap().unwrap();
        assert!(!found.active);
    }

    #[tokio::test]
    async fn mark_inactive_on_unknown_is_directory_error() {
        let directory = InMemoryDirectory::new();
        assert!(matches!(
            directory.mark_inactive("nobody").await,
            Err(AuthError::Directory(_))
        ));
    }
}
