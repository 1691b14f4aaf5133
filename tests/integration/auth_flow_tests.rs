//! End-to-end login, refresh and request authentication flows
use std::sync::Arc;

use chrono::Duration;
use sentinel_auth::{
    bearer_token, AuthError, AuthenticationService, Clock, InMemoryUserStore, TokenKind,
    TokenType,
};
use crate::test_utils::{
    setup_test_env, test_settings, UnreachableStore, TEST_EMAIL, TEST_PASSWORD, TEST_USERNAME,
};

#[tokio::test]
async fn test_login_issues_independent_tokens() {
    let env = setup_test_env().await;

    let tokens = env
        .service
        .login("10.0.0.1", TEST_EMAIL, TEST_PASSWORD)
        .await
        .expect("login should succeed");
    assert_eq!(tokens.token_type, TokenType::Bearer);
    assert_ne!(tokens.access_token, tokens.refresh_token);

    let verifier = env.service.verifier();
    let access = verifier.verify(&tokens.access_token, TokenKind::Access).unwrap();
    let refresh = verifier.verify(&tokens.refresh_token, TokenKind::Refresh).unwrap();

    assert_eq!(access.sub, env.user_id);
    assert_eq!(refresh.sub, env.user_id);
    assert_eq!(access.lifetime(), Duration::minutes(30));
    assert_eq!(refresh.lifetime(), Duration::days(7));
}

#[tokio::test]
async fn test_login_by_username() {
    let env = setup_test_env().await;
    let tokens = env.service.login("k", TEST_USERNAME, TEST_PASSWORD).await.unwrap();
    let claims = env.service.authenticate(&tokens.access_token).unwrap();
    assert_eq!(claims.sub, env.user_id);
}

#[tokio::test]
async fn test_failed_logins_throttle_client() {
    let env = setup_test_env().await;
    let client = "203.0.113.7";

    for attempt in 1..=5 {
        let err = env.service.login(client, TEST_EMAIL, "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials, "attempt {attempt}");
    }
    assert_eq!(env.store.calls(), 5);

    // Correct password, but the window is full
    let err = env.service.login(client, TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();
    assert_eq!(err, AuthError::RateLimited { retry_after_secs: 60 });
    assert_eq!(err.retry_after(), Some(60));
    assert_eq!(env.store.calls(), 5, "throttled attempts must not reach the store");

    // Other clients are unaffected
    assert!(env.service.login("198.51.100.1", TEST_EMAIL, TEST_PASSWORD).await.is_ok());

    env.clock.advance(Duration::seconds(60));
    assert!(env.service.login(client, TEST_EMAIL, TEST_PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_successful_logins_also_count() {
    let env = setup_test_env().await;
    for _ in 0..5 {
        env.service.login("k", TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    }
    assert!(matches!(
        env.service.login("k", TEST_EMAIL, TEST_PASSWORD).await,
        Err(AuthError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_unknown_identifier_indistinguishable() {
    let env = setup_test_env().await;
    let unknown = env.service.login("k1", "nobody@x.com", TEST_PASSWORD).await.unwrap_err();
    let wrong = env.service.login("k2", TEST_EMAIL, "wrong").await.unwrap_err();
    assert_eq!(unknown, wrong);
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.error_code(), wrong.error_code());
}

#[tokio::test]
async fn test_refresh_flow() {
    let env = setup_test_env().await;
    let tokens = env.service.login("k", TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    env.clock.advance(Duration::hours(1));
    assert_eq!(
        env.service.authenticate(&tokens.access_token),
        Err(AuthError::TokenExpired)
    );

    let refreshed = env.service.refresh(&tokens.refresh_token).unwrap();
    assert_eq!(refreshed.token_type, TokenType::Bearer);
    let claims = env.service.authenticate(&refreshed.access_token).unwrap();
    assert_eq!(claims.sub, env.user_id);
    assert_eq!(claims.iat, env.clock.now().timestamp());

    // Refresh tokens never pass as access tokens
    assert_eq!(
        env.service.authenticate(&tokens.refresh_token),
        Err(AuthError::WrongTokenKind {
            expected: TokenKind::Access,
            found: TokenKind::Refresh,
        })
    );
    assert!(matches!(
        env.service.refresh(&refreshed.access_token),
        Err(AuthError::WrongTokenKind { .. })
    ));

    env.clock.advance(Duration::days(7));
    assert_eq!(
        env.service.refresh(&tokens.refresh_token),
        Err(AuthError::TokenExpired)
    );
}

#[tokio::test]
async fn test_authenticate_from_header() {
    let env = setup_test_env().await;
    let tokens = env.service.login("k", TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    let header = format!("Bearer {}", tokens.access_token);
    let token = bearer_token(&header).expect("well-formed header");
    assert_eq!(env.service.authenticate(token).unwrap().sub, env.user_id);

    assert_eq!(
        env.service.authenticate("not-a-token"),
        Err(AuthError::InvalidSignature)
    );
}

#[tokio::test]
async fn test_store_outage_is_upstream_failure() {
    let service =
        AuthenticationService::from_settings(&test_settings(), Arc::new(UnreachableStore)).unwrap();

    let err = service.login("k", TEST_EMAIL, TEST_PASSWORD).await.unwrap_err();
    assert!(matches!(err, AuthError::UpstreamFailure(_)));

    // Connection details stay out of anything shown to callers
    assert!(!err.to_string().contains("db.internal"));
    assert!(!err.sanitized_message().contains("db.internal"));
}

#[tokio::test]
async fn test_hash_password_produces_usable_hash() {
    let env = setup_test_env().await;
    let hash = env.service.hash_password("n3w-pa55").await.unwrap();
    assert!(hash.starts_with("$argon2id$"));

    let hasher = sentinel_auth::PasswordHasher::new(&test_settings().password).unwrap();
    assert!(hasher.verify("n3w-pa55", &hash));
    assert!(!hasher.verify(TEST_PASSWORD, &hash));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_respect_limit() {
    let env = setup_test_env().await;
    let service = Arc::new(env.service);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.login("10.9.9.9", TEST_EMAIL, TEST_PASSWORD).await })
        })
        .collect();

    let mut allowed = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => allowed += 1,
            Err(AuthError::RateLimited { .. }) => limited += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(allowed, 5);
    assert_eq!(limited, 11);
    assert_eq!(env.store.calls(), 5);
}

#[tokio::test]
async fn test_legacy_bcrypt_account_can_log_in() {
    let store = Arc::new(InMemoryUserStore::new());
    let legacy = bcrypt::hash("hunter22", 4).unwrap();
    let id = store.add_user("legacy", "legacy@x.com", legacy).await;

    let service = AuthenticationService::from_settings(&test_settings(), store).unwrap();
    let tokens = service.login("k", "legacy@x.com", "hunter22").await.unwrap();
    assert_eq!(service.authenticate(&tokens.access_token).unwrap().sub, id);

    assert_eq!(
        service.login("k", "legacy", "hunter2").await.unwrap_err(),
        AuthError::InvalidCredentials
    );
}
