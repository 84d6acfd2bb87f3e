use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable with or without a session. `/` is listed in the default public
/// route set; the others are unlisted and pass the guard by default.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Landing page. Links to the dashboard or the sign-in page depending on the session.
        .route("/", get(handlers::landing_page))
        // GET /health
        // Liveness check for load balancers. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // GET /auth/session
        // Snapshot of the refreshed session for the client-side auth store.
        .route("/auth/session", get(handlers::get_session))
        // POST /auth/sign-out
        // Revokes the session and clears the cookies. Harmless without a session.
        .route("/auth/sign-out", post(handlers::sign_out))
}
