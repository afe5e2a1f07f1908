use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and token lifecycle errors.
///
/// All variants are expected, recoverable outcomes surfaced to the caller;
/// nothing here represents a crash. Messages never echo secrets, password
/// hashes, or token bytes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Unknown identifier, wrong password, or inactive account at login.
    /// Deliberately a single variant so callers cannot enumerate identifiers.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account exists but is no longer usable.
    #[error("Account is inactive")]
    InactiveAccount,

    /// Token cannot be parsed into header/payload/signature.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Signature does not match any trusted signing key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token expired beyond the configured leeway.
    #[error("Token expired")]
    Expired,

    /// Token issued in the future beyond the configured leeway.
    #[error("Token not yet valid")]
    NotYetValid,

    /// Token id or subject has been revoked.
    #[error("Token revoked")]
    Revoked,

    /// Token header declares an algorithm other than the configured one.
    #[error("Algorithm mismatch: {0}")]
    AlgorithmMismatch(String),

    /// The hashing primitive itself failed (not a credential mismatch).
    #[error("Hashing failure: {0}")]
    HashingFailure(String),

    /// Invalid input to an issuance operation (reserved claim key, bad TTL).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration or key material.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The user directory collaborator failed.
    #[error("Directory error: {0}")]
    Directory(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::NotYetValid,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => {
                AuthError::AlgorithmMismatch("algorithm not in trusted set".into())
            }
            ErrorKind::InvalidToken => AuthError::MalformedToken("invalid token structure".into()),
            ErrorKind::Base64(e) => AuthError::MalformedToken(format!("base64 decode: {e}")),
            ErrorKind::Json(e) => AuthError::MalformedToken(format!("claims decode: {e}")),
            ErrorKind::Utf8(e) => AuthError::MalformedToken(format!("claims encoding: {e}")),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::MalformedToken(format!("missing claim: {claim}"))
            }
            ErrorKind::InvalidRsaKey(e) => {
                AuthError::Configuration(format!("invalid RSA key: {e}"))
            }
            ErrorKind::InvalidKeyFormat => AuthError::Configuration("invalid key format".into()),
            _ => AuthError::MalformedToken(format!("token error: {err}")),
        }
    }
}
