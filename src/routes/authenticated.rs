use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for signed-in users. `/dashboard` and everything below it is protected by the
/// default route policy; handlers additionally require the `AuthUser` extractor, which
/// rejects with 401 if the policy was configured to let an anonymous request through.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard_page))
        .route("/dashboard/settings", get(handlers::settings_page))
        // GET /me
        // The current user as JSON. Also accepts a bearer access token.
        .route("/me", get(handlers::get_me))
}
