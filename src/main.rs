use dashboard_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    supabase::{AuthBackendState, SupabaseAuthClient},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, the auth backend client and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise debug for this crate, request summaries from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dashboard_gate=debug,tower_http=info".into());

    // 3. Log format follows the environment: pretty locally, JSON for aggregators in prod.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    tracing::info!(
        public = ?config.routes.public.patterns(),
        auth_only = ?config.routes.auth_only.patterns(),
        protected = ?config.routes.protected.patterns(),
        after_login = %config.routes.after_login,
        after_logout = %config.routes.after_logout,
        "route policy loaded"
    );
    for warning in config.routes.redirect_warnings() {
        tracing::warn!("route policy: {}", warning);
    }

    // 4. Auth Backend (Supabase GoTrue)
    let auth_client = SupabaseAuthClient::new(&config.supabase_url, &config.supabase_anon_key)
        .expect("FATAL: Failed to build the auth backend HTTP client.");
    let auth = Arc::new(auth_client) as AuthBackendState;

    // 5. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState { auth, config };

    // 6. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
