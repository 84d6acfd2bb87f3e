use std::env;

use crate::policy::{RoutePolicy, RouteSet};

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through `AppState` (pulled into handlers and the route guard via
/// `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and cookie hardening.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the Supabase project (the auth API lives under /auth/v1).
    pub supabase_url: String,
    // Public anon key, sent as the `apikey` header on every auth API call.
    pub supabase_anon_key: String,
    // Secret used to verify access tokens locally (Supabase-managed HS256 secret).
    pub jwt_secret: String,
    // Route lists and redirect destinations evaluated by the route guard.
    pub routes: RoutePolicy,
    // Names and attributes of the session cookies.
    pub cookies: CookieSettings,
}

/// Env
///
/// Defines the runtime context: local development (pretty logs, plain-HTTP cookies)
/// or production (JSON logs, `Secure` cookies, mandatory secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// CookieSettings
///
/// The two session cookies written on sign-in and on every successful refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieSettings {
    pub access_token: String,
    pub refresh_token: String,
    pub secure: bool,
    pub max_age_days: i64,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            access_token: "sb-access-token".to_string(),
            refresh_token: "sb-refresh-token".to_string(),
            secure: false,
            max_age_days: 400,
        }
    }
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup,
    /// so state can be assembled without touching environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            routes: RoutePolicy::default(),
            cookies: CookieSettings::default(),
        }
    }
}

/// env_bool
///
/// Reads a boolean-ish environment variable (`1/true/yes/on`, `0/false/no/off`).
pub fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics in `Env::Production` if `SUPABASE_URL`, `SUPABASE_ANON_KEY` or
    /// `SUPABASE_JWT_SECRET` is missing, so the server never starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let (supabase_url, supabase_anon_key, jwt_secret) = match env {
            Env::Production => (
                env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod"),
                env::var("SUPABASE_ANON_KEY").expect("FATAL: SUPABASE_ANON_KEY required in prod"),
                env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            ),
            // Local falls back to the defaults of a `supabase start` stack.
            Env::Local => (
                env::var("SUPABASE_URL").unwrap_or(defaults.supabase_url),
                env::var("SUPABASE_ANON_KEY").unwrap_or(defaults.supabase_anon_key),
                env::var("SUPABASE_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            ),
        };

        let route_defaults = defaults.routes;
        let routes = RoutePolicy {
            public: route_set_from_env("PUBLIC_ROUTES").unwrap_or(route_defaults.public),
            auth_only: route_set_from_env("AUTH_ROUTES").unwrap_or(route_defaults.auth_only),
            protected: route_set_from_env("PROTECTED_ROUTES")
                .unwrap_or(route_defaults.protected),
            after_login: env::var("AFTER_LOGIN_PATH").unwrap_or(route_defaults.after_login),
            after_logout: env::var("AFTER_LOGOUT_PATH").unwrap_or(route_defaults.after_logout),
        };

        let cookies = CookieSettings {
            secure: env_bool("COOKIE_SECURE").unwrap_or(env == Env::Production),
            ..CookieSettings::default()
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            jwt_secret,
            routes,
            cookies,
        }
    }
}

fn route_set_from_env(key: &str) -> Option<RouteSet> {
    env::var(key).ok().map(|raw| RouteSet::from_csv(&raw))
}
