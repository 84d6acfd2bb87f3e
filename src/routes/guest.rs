use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Guest Router Module
///
/// The sign-in and registration surface. The pages are in the default auth-only route
/// set, so a visitor who already has a session is redirected to the after-login page.
pub fn guest_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::login_page))
        .route("/signup", get(handlers::signup_page))
        .route("/forgot-password", get(handlers::forgot_password_page))
        // POST /auth/sign-in
        // Password grant against the auth backend; sets the session cookies.
        .route("/auth/sign-in", post(handlers::sign_in))
        // POST /auth/sign-up
        // Account creation; sets cookies when the backend returns a session.
        .route("/auth/sign-up", post(handlers::sign_up))
}
