use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use dashboard_gate::{
    AppConfig, AppState, MockAuthBackend,
    auth::{AuthUser, Claims, CurrentSession, issue_access_token, verify_access_token},
    models::{AuthBackendUser, SessionUser},
    supabase::AuthBackendState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn now() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn create_token(aud: &str, exp: usize, secret: &str) -> String {
    let claims = Claims {
        sub: TEST_USER_ID,
        iat: now(),
        exp,
        aud: aud.to_string(),
        email: Some("test@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state() -> AppState {
    let config = AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        auth: Arc::new(MockAuthBackend::new(TEST_JWT_SECRET)) as AuthBackendState,
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- Token Verification ---

#[test]
fn test_issued_token_round_trips_through_verification() {
    let user = AuthBackendUser {
        id: TEST_USER_ID,
        email: Some("test@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };

    let (token, issued) = issue_access_token(&user, 600, TEST_JWT_SECRET).unwrap();
    let claims = verify_access_token(&token, TEST_JWT_SECRET).unwrap();

    assert_eq!(claims.sub, TEST_USER_ID);
    assert_eq!(claims.exp, issued.exp);
    assert_eq!(claims.aud, "authenticated");
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));
}

#[test]
fn test_verification_rejects_wrong_secret() {
    let token = create_token("authenticated", now() + 3600, "some-other-secret");
    assert!(verify_access_token(&token, TEST_JWT_SECRET).is_err());
}

#[test]
fn test_verification_rejects_expired_token() {
    // Well past the default leeway.
    let token = create_token("authenticated", now() - 600, TEST_JWT_SECRET);
    assert!(verify_access_token(&token, TEST_JWT_SECRET).is_err());
}

#[test]
fn test_verification_rejects_foreign_audience() {
    let token = create_token("anon", now() + 3600, TEST_JWT_SECRET);
    assert!(verify_access_token(&token, TEST_JWT_SECRET).is_err());
}

#[test]
fn test_verification_rejects_garbage() {
    assert!(verify_access_token("not-a-jwt", TEST_JWT_SECRET).is_err());
}

// --- AuthUser Extractor ---

#[tokio::test]
async fn test_auth_user_from_guard_extension() {
    let app_state = create_app_state();
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.extensions.insert(SessionUser {
        id: TEST_USER_ID,
        email: None,
        role: "authenticated".to_string(),
        expires_at: None,
    });

    let AuthUser(user) = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.id, TEST_USER_ID);
}

#[tokio::test]
async fn test_auth_success_with_valid_bearer() {
    let token = create_token("authenticated", now() + 3600, TEST_JWT_SECRET);
    let app_state = create_app_state();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(auth_user.is_ok());
    let AuthUser(user) = auth_user.unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.role, "authenticated");
    assert!(user.expires_at.is_some());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state();
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_bearer() {
    let token = create_token("authenticated", now() - 600, TEST_JWT_SECRET);
    let app_state = create_app_state();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let token = create_token("authenticated", now() + 3600, TEST_JWT_SECRET);
    let app_state = create_app_state();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Token {}", token)).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- CurrentSession Extractor ---

#[tokio::test]
async fn test_current_session_is_optional() {
    let app_state = create_app_state();
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let CurrentSession(user) = CurrentSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(user.is_none());

    parts.extensions.insert(SessionUser::default());
    let CurrentSession(user) = CurrentSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(user.is_some());
}
