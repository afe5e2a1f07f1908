//! End-to-end flows through the public API: login, authorize, revoke,
//! refresh, rotation, and the failure modes a gateway maps to status
//! codes.

use std::sync::Arc;

use auth_core::{
    Algorithm, AuthConfig, AuthError, AuthService, HashingSettings, InMemoryDirectory, KeyRing,
    PasswordHasher, SigningKey, StoredIdentity, UserDirectory,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Map;

// Minimal Argon2 cost so the suite stays fast.
fn fast_config() -> AuthConfig {
    AuthConfig {
        hashing: HashingSettings {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..AuthConfig::default()
    }
}

fn test_secret() -> Vec<u8> {
    (0..32u8).map(|i| i.wrapping_mul(47).wrapping_add(3)).collect()
}

fn test_keys() -> Arc<KeyRing> {
    let key = SigningKey::from_hmac_secret("k1", Algorithm::HS256, &test_secret()).unwrap();
    Arc::new(KeyRing::new(key, 3))
}

fn seeded_directory(config: &AuthConfig, users: &[(&str, &str, bool)]) -> Arc<InMemoryDirectory> {
    let hasher = PasswordHasher::new(&config.hashing).unwrap();
    let directory = InMemoryDirectory::new();
    for (subject, password, active) in users {
        directory.upsert(StoredIdentity {
            subject: (*subject).to_owned(),
            password_hash: hasher.hash(password).unwrap(),
            active: *active,
            attributes: Map::new(),
        });
    }
    Arc::new(directory)
}

fn build_service(config: AuthConfig, users: &[(&str, &str, bool)]) -> AuthService {
    let directory = seeded_directory(&config, users);
    AuthService::new(&config, test_keys(), directory).unwrap()
}

#[tokio::test]
async fn login_authorize_revoke_lifecycle() {
    // Token for "alice" with the default 30-minute TTL.
    let service = build_service(fast_config(), &[("alice", "s3cret-pw", true)]);

    let issued = service.login("alice", "s3cret-pw").await.unwrap();
    assert_eq!(issued.expires_in, 1800);

    let claims = service.authorize(&issued.token).await.unwrap();
    assert_eq!(claims.sub, "alice");

    service.revoke(&issued.token).await.unwrap();
    assert!(matches!(
        service.authorize(&issued.token).await,
        Err(AuthError::Revoked)
    ));

    // Revoking again is a no-op, not an error.
    service.revoke(&issued.token).await.unwrap();

    // A fresh login is unaffected by the revoked token.
    let again = service.login("alice", "s3cret-pw").await.unwrap();
    assert!(service.authorize(&again.token).await.is_ok());
}

#[tokio::test]
async fn repeated_wrong_passwords_fail_uniformly_without_lockout() {
    let service = build_service(fast_config(), &[("alice", "s3cret-pw", true)]);

    for _ in 0..3 {
        assert!(matches!(
            service.login("alice", "guess").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
    // Unknown identifier fails with the same kind.
    assert!(matches!(
        service.login("mallory", "guess").await,
        Err(AuthError::InvalidCredentials)
    ));

    // No lockout: the account is still active and usable.
    assert!(service.login("alice", "s3cret-pw").await.is_ok());
}

#[tokio::test]
async fn tampered_payload_fails_signature_check() {
    let service = build_service(fast_config(), &[("alice", "s3cret-pw", true)]);
    let issued = service.login("alice", "s3cret-pw").await.unwrap();

    let parts: Vec<&str> = issued.token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let mut payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
    payload[10] ^= 0x01;
    let tampered = format!(
        "{}.{}.{}",
        parts[0],
        URL_SAFE_NO_PAD.encode(&payload),
        parts[2]
    );

    assert!(matches!(
        service.authorize(&tampered).await,
        Err(AuthError::InvalidSignature)
    ));
}

#[tokio::test]
async fn token_expires_after_its_ttl() {
    let config = AuthConfig {
        access_ttl_secs: 1,
        clock_skew_leeway_secs: 0,
        ..fast_config()
    };
    let service = build_service(config, &[("alice", "s3cret-pw", true)]);

    let issued = service.login("alice", "s3cret-pw").await.unwrap();
    assert!(service.authorize(&issued.token).await.is_ok());

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    assert!(matches!(
        service.authorize(&issued.token).await,
        Err(AuthError::Expired)
    ));
}

#[tokio::test]
async fn account_deactivation_is_seen_on_authorize() {
    let config = fast_config();
    let directory = seeded_directory(&config, &[("alice", "s3cret-pw", true)]);
    let service =
        AuthService::new(&config, test_keys(), Arc::clone(&directory) as Arc<dyn UserDirectory>)
            .unwrap();

    let issued = service.login("alice", "s3cret-pw").await.unwrap();
    assert!(service.authorize(&issued.token).await.is_ok());

    directory.mark_inactive("alice").await.unwrap();
    assert!(matches!(
        service.authorize(&issued.token).await,
        Err(AuthError::InactiveAccount)
    ));
}

#[tokio::test]
async fn tokens_survive_key_rotation_within_the_window() {
    let config = fast_config();
    let keys = test_keys();
    let directory = seeded_directory(&config, &[("alice", "s3cret-pw", true)]);
    let service = AuthService::new(&config, Arc::clone(&keys), directory).unwrap();

    let issued = service.login("alice", "s3cret-pw").await.unwrap();

    let next_secret: Vec<u8> = (0..32u8).map(|i| i.wrapping_mul(53).wrapping_add(11)).collect();
    let next = SigningKey::from_hmac_secret("k2", Algorithm::HS256, &next_secret).unwrap();
    keys.rotate(next).await.unwrap();

    // Old token verifies via the retained key; new logins sign with k2.
    assert!(service.authorize(&issued.token).await.is_ok());
    let fresh = service.login("alice", "s3cret-pw").await.unwrap();
    assert!(service.authorize(&fresh.token).await.is_ok());
}

#[tokio::test]
async fn refresh_without_rotation_keeps_old_token_valid() {
    let config = AuthConfig {
        revoke_on_refresh: false,
        ..fast_config()
    };
    let service = build_service(config, &[("alice", "s3cret-pw", true)]);

    let original = service.login("alice", "s3cret-pw").await.unwrap();
    let refreshed = service.refresh(&original.token).await.unwrap();

    assert_ne!(refreshed.claims.jti, original.claims.jti);
    assert!(service.authorize(&original.token).await.is_ok());
    assert!(service.authorize(&refreshed.token).await.is_ok());
}

#[tokio::test]
async fn refresh_with_rotation_spends_the_old_token() {
    let service = build_service(fast_config(), &[("alice", "s3cret-pw", true)]);

    let original = service.login("alice", "s3cret-pw").await.unwrap();
    let refreshed = service.refresh(&original.token).await.unwrap();

    assert!(matches!(
        service.authorize(&original.token).await,
        Err(AuthError::Revoked)
    ));
    // The spent token cannot be refreshed a second time.
    assert!(matches!(
        service.refresh(&original.token).await,
        Err(AuthError::Revoked)
    ));
    assert!(service.authorize(&refreshed.token).await.is_ok());
}

#[tokio::test]
async fn revoke_all_cuts_off_outstanding_tokens() {
    let service = build_service(fast_config(), &[("alice", "s3cret-pw", true)]);

    let first = service.login("alice", "s3cret-pw").await.unwrap();
    let second = service.login("alice", "s3cret-pw").await.unwrap();

    service.revoke_all("alice");
    assert!(matches!(
        service.authorize(&first.token).await,
        Err(AuthError::Revoked)
    ));
    assert!(matches!(
        service.authorize(&second.token).await,
        Err(AuthError::Revoked)
    ));

    // Past the watermark's second, new logins mint usable tokens again.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let fresh = service.login("alice", "s3cret-pw").await.unwrap();
    assert!(service.authorize(&fresh.token).await.is_ok());
}

#[tokio::test]
async fn sweep_reclaims_expired_revocations() {
    let config = AuthConfig {
        access_ttl_secs: 1,
        clock_skew_leeway_secs: 0,
        ..fast_config()
    };
    let service = build_service(config, &[("alice", "s3cret-pw", true)]);

    let issued = service.login("alice", "s3cret-pw").await.unwrap();
    service.revoke(&issued.token).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
    assert_eq!(service.sweep_revocations(), 1);
}

#[tokio::test]
async fn malformed_tokens_are_rejected_as_malformed() {
    let service = build_service(fast_config(), &[]);

    for garbage in ["", "abc", "a.b", "a.b.c.d", "not a token at all"] {
        assert!(
            matches!(
                service.authorize(garbage).await,
                Err(AuthError::MalformedToken(_))
            ),
            "expected MalformedToken for {garbage:?}"
        );
    }
}
