// ABOUTME: Integration tests for session token issuance and validation
// ABOUTME: Covers round-trips, replay rejection, expiry ordering, forgery, and stale tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use vaultgate::auth::TokenService;
use vaultgate::errors::ErrorKind;
use vaultgate::models::AuthKeyRecord;

const SECRET: &[u8] = b"test-signing-secret";

fn record(key: &str, admin: bool) -> AuthKeyRecord {
    AuthKeyRecord {
        key: key.to_string(),
        admin,
        expiration: 0,
        ip_allow_list: vec![],
        owner: "tests".to_string(),
    }
}

fn service() -> TokenService {
    TokenService::new(SECRET, Duration::hours(1))
}

#[test]
fn issue_validate_round_trip_preserves_claims() {
    let tokens = service();
    let rec = record("abc123", true);

    let token = tokens.issue(&rec, "1.2.3.4").unwrap();
    let claims = tokens.validate(&token, "1.2.3.4").unwrap();

    assert_eq!(claims.sub, "abc123");
    assert!(claims.admin);
    assert_eq!(claims.addr, "1.2.3.4");
    assert!(claims.exp > Utc::now().timestamp());
}

#[test]
fn non_admin_flag_survives_the_round_trip() {
    let tokens = service();
    let token = tokens.issue(&record("plainkey", false), "10.0.0.1").unwrap();
    let claims = tokens.validate(&token, "10.0.0.1").unwrap();
    assert!(!claims.admin);
}

#[test]
fn replay_from_a_different_address_is_rejected() {
    let tokens = service();
    let token = tokens.issue(&record("abc123", false), "1.2.3.4").unwrap();

    let err = tokens.validate(&token, "9.9.9.9").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFaultNeedsLog);
    assert!(err.message().contains("replay"));
}

#[test]
fn expired_token_fails_as_expired_never_as_replay_or_forged() {
    let tokens = service();
    let token = tokens
        .issue_with_expiry(
            &record("abc123", false),
            "1.2.3.4",
            Utc::now() - Duration::seconds(1),
        )
        .unwrap();

    let err = tokens.validate(&token, "1.2.3.4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFault);
    assert!(err.message().contains("expired"));

    // Expiry is checked before address binding: an expired token from the
    // wrong address is still just expired.
    let err = tokens.validate(&token, "9.9.9.9").unwrap_err();
    assert!(err.message().contains("expired"));
}

#[test]
fn token_signed_with_another_secret_is_forged() {
    let tokens = service();
    let imposter = TokenService::new(b"some-other-secret", Duration::hours(1));

    let token = imposter.issue(&record("abc123", true), "1.2.3.4").unwrap();
    let err = tokens.validate(&token, "1.2.3.4").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserFaultNeedsLog);
    assert!(err.message().contains("signature"));
}

#[test]
fn structurally_incomplete_token_is_a_stale_version() {
    // A correctly signed token from an older claim layout: no bound
    // address. It must be rejected as stale, not as forged or replayed.
    #[derive(serde::Serialize)]
    struct OldClaims {
        sub: String,
        exp: i64,
    }

    let old = OldClaims {
        sub: "abc123".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &old,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let err = service().validate(&token, "1.2.3.4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFault);
    assert!(err.message().contains("stale"));
}

#[test]
fn garbage_token_is_a_plain_user_fault() {
    let err = service().validate("not-a-token-at-all", "1.2.3.4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserFault);
}
