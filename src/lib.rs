use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Route classification and redirect policy.
pub mod policy;
// Session cookie refresh against the auth backend.
pub mod session;
// The route guard applying the policy to every request.
pub mod middleware;

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod supabase;

// Module for routing segregation (Public, Guest, Authenticated).
pub mod routes;
use routes::{authenticated, guest, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use policy::{Decision, RedirectTarget, RoutePolicy, RouteSet, classify, decide};
pub use supabase::{AuthBackendState, MockAuthBackend, SupabaseAuthClient};

/// ApiDoc
///
/// Auto-generated OpenAPI document for the session API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_session, handlers::sign_in, handlers::sign_up,
        handlers::sign_out, handlers::get_me
    ),
    components(
        schemas(
            models::SessionUser, models::SessionSnapshot, models::SignInRequest,
            models::SignInResponse, models::SignUpRequest, models::SignUpResponse,
            models::SignOutResponse, models::AuthBackendUser,
        )
    ),
    tags(
        (name = "dashboard-gate", description = "Session and route protection API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container for everything a request needs: the auth backend
/// and the immutable configuration (route policy included). Passed explicitly to the
/// guard and handlers; there is no global session store.
#[derive(Clone)]
pub struct AppState {
    /// Auth Layer: the managed auth service (hosted Supabase or the in-process mock).
    pub auth: AuthBackendState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, wraps it in the route guard and applies the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(guest::guest_routes())
        .merge(authenticated::authenticated_routes())
        .fallback(handlers::not_found)
        // Added after the fallback so unknown paths are guarded too.
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::route_guard,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` so every log line of a
/// request (guard decisions included) can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
