//! Credential issuance and verification core.
//!
//! Library backing for token-based authentication in a network-facing
//! service: password verification, signed token issuance and
//! verification, and revocation bookkeeping. The HTTP surface and the
//! user store are external collaborators: the service maps error kinds
//! to status codes, and the directory is injected behind a trait.
//!
//! **Security features**:
//! - Argon2id password hashing with a configurable work factor
//! - Signed, self-contained tokens carrying a unique `jti`
//! - Single pinned signing algorithm (no algorithm-confusion downgrades)
//! - Key rotation with a bounded retained-key verification window
//! - In-process revocation registry with TTL-bounded memory
//!
//! ## Modules
//!
//! - `config`: environment-driven settings
//! - `directory`: user-directory collaborator interface
//! - `error`: error taxonomy
//! - `keys`: signing key material and rotation
//! - `password`: credential hashing and verification
//! - `revocation`: revoked-token bookkeeping
//! - `service`: orchestration (login, authorize, revoke, refresh)
//! - `token`: claims model and token codec

pub mod config;
pub mod directory;
pub mod error;
pub mod keys;
pub mod password;
pub mod revocation;
pub mod service;
pub mod token;

// Re-export the types most callers touch.
pub use config::{AuthConfig, HashingSettings};
pub use directory::{InMemoryDirectory, StoredIdentity, UserDirectory};
pub use error::{AuthError, Result};
pub use keys::{generate_hmac_secret, Algorithm, KeyRing, SigningKey};
pub use password::PasswordHasher;
pub use revocation::RevocationRegistry;
pub use service::AuthService;
pub use token::{Claims, IssuedToken, TokenCodec};
