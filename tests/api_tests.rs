use dashboard_gate::{
    AppConfig, AppState, MockAuthBackend, create_router, supabase::AuthBackendState,
};
use reqwest::{StatusCode, header, redirect::Policy};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub backend: Arc<MockAuthBackend>,
}

async fn spawn_app() -> TestApp {
    let config = AppConfig::default();
    let backend = Arc::new(MockAuthBackend::new(&config.jwt_secret));

    let state = AppState {
        auth: backend.clone() as AuthBackendState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, backend }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Turns `Set-Cookie` headers into a `Cookie` request header, dropping removals.
fn cookie_header(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| !value.contains("Max-Age=0"))
        .filter_map(|value| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = spawn_app().await;
    let client = client();

    // 1. Anonymous visit to the dashboard bounces to login with a return path.
    let response = client
        .get(format!("{}/dashboard/settings", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, "/login?redirectTo=%2Fdashboard%2Fsettings");

    // 2. Sign in, handing the return path back.
    let response = client
        .post(format!("{}/auth/sign-in", app.address))
        .json(&json!({
            "email": "demo@example.com",
            "password": "password123",
            "redirect_to": "/dashboard/settings"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = cookie_header(&response);
    assert!(cookies.contains("sb-access-token="));
    assert!(cookies.contains("sb-refresh-token="));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["redirect_to"], "/dashboard/settings");

    // 3. The session opens the dashboard and closes the login page.
    let response = client
        .get(format!("{}/dashboard/settings", app.address))
        .header(header::COOKIE, &cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get(format!("{}/login", app.address))
        .header(header::COOKIE, &cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        "/dashboard"
    );

    let response = client
        .get(format!("{}/auth/session", app.address))
        .header(header::COOKIE, &cookies)
        .send()
        .await
        .unwrap();
    let snapshot: Value = response.json().await.unwrap();
    assert_eq!(snapshot["is_authenticated"], true);
    assert_eq!(snapshot["user"]["email"], "demo@example.com");

    // 4. Sign out clears both cookies.
    let response = client
        .post(format!("{}/auth/sign-out", app.address))
        .header(header::COOKIE, &cookies)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let removed = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter(|value| value.to_str().unwrap().contains("Max-Age=0"))
        .count();
    assert_eq!(removed, 2);

    // The in-process backend never had to refresh: every access token was still valid.
    assert_eq!(app.backend.refresh_calls(), 0);
}

#[tokio::test]
async fn test_bearer_token_for_api_clients() {
    let app = spawn_app().await;
    let client = client();

    let response = client
        .post(format!("{}/auth/sign-in", app.address))
        .json(&json!({ "email": "demo@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    let access_token = cookie_header(&response)
        .split("; ")
        .find_map(|pair| pair.strip_prefix("sb-access-token="))
        .map(str::to_string)
        .unwrap();

    let response = client
        .get(format!("{}/me", app.address))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["email"], "demo@example.com");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;

    let response = client()
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/auth/sign-in"].is_object());
    assert!(doc["paths"]["/auth/session"].is_object());
}
