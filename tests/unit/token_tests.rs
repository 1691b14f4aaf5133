//! Token issuance and verification against the public API
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sentinel_auth::auth::ISSUER;
use sentinel_auth::{
    AuthError, Clock, ManualClock, SigningKey, TokenIssuer, TokenKind, TokenVerifier,
};
use crate::test_utils::{test_settings, TEST_SIGNING_KEY};

fn pair() -> (TokenIssuer, TokenVerifier, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let settings = test_settings();
    let issuer = TokenIssuer::from_settings(&settings.tokens, clock.clone()).unwrap();
    let verifier = TokenVerifier::from_settings(&settings.tokens, clock.clone()).unwrap();
    (issuer, verifier, clock)
}

fn sign(payload: &serde_json::Value, alg: Algorithm) -> String {
    encode(
        &Header::new(alg),
        payload,
        &EncodingKey::from_secret(TEST_SIGNING_KEY.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_round_trip_recovers_subject() {
    let (issuer, verifier, _) = pair();
    for subject in ["1", "user-42", "a@x.com", "550e8400-e29b-41d4-a716-446655440000"] {
        let token = issuer.issue_access_token(subject).unwrap();
        assert_eq!(verifier.verify(&token, TokenKind::Access).unwrap().sub, subject);
    }
}

#[test]
fn test_token_is_compact_and_url_safe() {
    let (issuer, _, _) = pair();
    let token = issuer.issue_refresh_token("user-1").unwrap();
    assert_eq!(token.split('.').count(), 3);
    assert!(token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
}

#[test]
fn test_default_lifetimes() {
    let (issuer, verifier, _) = pair();
    let access = issuer.issue_access_token("u").unwrap();
    let refresh = issuer.issue_refresh_token("u").unwrap();

    let access = verifier.verify(&access, TokenKind::Access).unwrap();
    let refresh = verifier.verify(&refresh, TokenKind::Refresh).unwrap();
    assert_eq!(access.lifetime(), Duration::minutes(30));
    assert_eq!(refresh.lifetime(), Duration::days(7));
    assert_eq!(access.iss, ISSUER);
}

#[test]
fn test_expired_refresh_token() {
    let (issuer, verifier, clock) = pair();
    let token = issuer.issue_refresh_token("u").unwrap();
    clock.advance(Duration::days(7) + Duration::seconds(1));
    assert_eq!(verifier.verify(&token, TokenKind::Refresh), Err(AuthError::TokenExpired));
}

#[test]
fn test_expiry_precedes_kind_check() {
    let (issuer, verifier, clock) = pair();
    let token = issuer.issue_access_token("u").unwrap();
    clock.advance(Duration::hours(1));
    // Expired and the wrong kind: expiry is reported
    assert_eq!(verifier.verify(&token, TokenKind::Refresh), Err(AuthError::TokenExpired));
}

#[test]
fn test_every_signature_byte_matters() {
    let (issuer, verifier, _) = pair();
    let token = issuer.issue_access_token("u").unwrap();
    let split = token.rfind('.').unwrap() + 1;

    // The final base64 character may carry padding bits, so skip it
    for index in split..token.len() - 1 {
        let mut bytes = token.clone().into_bytes();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert_eq!(
            verifier.verify(&tampered, TokenKind::Access),
            Err(AuthError::InvalidSignature),
            "mutation at {index} accepted"
        );
    }
}

#[test]
fn test_payload_tampering_detected() {
    let (issuer, verifier, clock) = pair();
    let token = issuer.issue_access_token("user-1").unwrap();
    let parts: Vec<&str> = token.split('.').collect();

    let now = clock.now().timestamp();
    let forged_payload = serde_json::json!({
        "sub": "admin", "iat": now, "exp": now + 60, "iss": ISSUER, "type": "access"
    });
    let forged = sign(&forged_payload, Algorithm::HS256);
    let forged_parts: Vec<&str> = forged.split('.').collect();

    // Someone else's payload under our signature
    let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);
    assert_eq!(verifier.verify(&spliced, TokenKind::Access), Err(AuthError::InvalidSignature));
}

#[test]
fn test_other_algorithms_rejected() {
    let (_, verifier, clock) = pair();
    let now = clock.now().timestamp();
    let payload = serde_json::json!({
        "sub": "u", "iat": now, "exp": now + 60, "iss": ISSUER, "type": "access"
    });
    let token = sign(&payload, Algorithm::HS512);
    assert_eq!(verifier.verify(&token, TokenKind::Access), Err(AuthError::InvalidSignature));
}

#[test]
fn test_missing_claims_reported() {
    let (_, verifier, clock) = pair();
    let now = clock.now().timestamp();

    let no_subject = serde_json::json!({
        "iat": now, "exp": now + 60, "iss": ISSUER, "type": "access"
    });
    assert_eq!(
        verifier.verify(&sign(&no_subject, Algorithm::HS256), TokenKind::Access),
        Err(AuthError::MissingClaim("sub"))
    );

    let no_expiry = serde_json::json!({
        "sub": "u", "iat": now, "iss": ISSUER, "type": "access"
    });
    assert_eq!(
        verifier.verify(&sign(&no_expiry, Algorithm::HS256), TokenKind::Access),
        Err(AuthError::MissingClaim("exp"))
    );

    let no_kind = serde_json::json!({
        "sub": "u", "iat": now, "exp": now + 60, "iss": ISSUER
    });
    assert_eq!(
        verifier.verify(&sign(&no_kind, Algorithm::HS256), TokenKind::Access),
        Err(AuthError::MissingClaim("type"))
    );
}

#[test]
fn test_verifier_rejects_missing_key() {
    let clock = Arc::new(ManualClock::starting_now());
    let mut settings = test_settings();
    settings.tokens.signing_key = None;
    assert!(matches!(
        TokenVerifier::from_settings(&settings.tokens, clock),
        Err(AuthError::Config(_))
    ));
}

#[test]
fn test_keys_are_not_interchangeable() {
    let clock = Arc::new(ManualClock::starting_now());
    let a = SigningKey::new("a".repeat(32)).unwrap();
    let b = SigningKey::new("b".repeat(32)).unwrap();
    let issuer =
        TokenIssuer::new(&a, Duration::minutes(30), Duration::days(7), clock.clone()).unwrap();
    let verifier = TokenVerifier::new(&b, clock);

    let token = issuer.issue_access_token("u").unwrap();
    assert_eq!(verifier.verify(&token, TokenKind::Access), Err(AuthError::InvalidSignature));
}
