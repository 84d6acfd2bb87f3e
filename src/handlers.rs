use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    auth::{AuthUser, CurrentSession},
    error::AuthError,
    models::{
        SessionSnapshot, SessionUser, SignInRequest, SignInResponse, SignOutResponse,
        SignUpOutcome, SignUpRequest, SignUpResponse,
    },
    policy,
    session::SessionTokens,
};

// --- Session API ---

/// get_session
///
/// [Any Route] Returns the session as refreshed by the route guard. The client-side auth
/// store polls this to mirror server state instead of keeping its own copy.
#[utoipa::path(
    get,
    path = "/auth/session",
    responses((status = 200, description = "Current session", body = SessionSnapshot))
)]
pub async fn get_session(CurrentSession(user): CurrentSession) -> Json<SessionSnapshot> {
    Json(SessionSnapshot::from(user))
}

/// sign_in
///
/// [Auth API] Password sign-in. On success the session cookies are set and the client is
/// told where to go next: the requested `redirect_to` if it is a safe local path,
/// otherwise the configured after-login page.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 502, description = "Auth backend unavailable")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>), AuthError> {
    let grant = state
        .auth
        .sign_in_with_password(&payload.email, &payload.password)
        .await?;

    let user = SessionUser::from(&grant);
    tracing::info!(user_id = %user.id, "user signed in");

    let redirect_to =
        policy::safe_return_path(payload.redirect_to.as_deref(), &state.config.routes);
    let jar = state.config.cookies.write(jar, &grant);

    Ok((jar, Json(SignInResponse { user, redirect_to })))
}

/// sign_up
///
/// [Auth API] Registers a new account. If the backend issues a session straight away
/// (email confirmation disabled) the session cookies are set as for sign-in.
#[utoipa::path(
    post,
    path = "/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Rejected by auth backend")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignUpRequest>,
) -> Result<Response, AuthError> {
    let outcome = state.auth.sign_up(&payload.email, &payload.password).await?;

    let response = match outcome {
        SignUpOutcome::Session(grant) => {
            let jar = state.config.cookies.write(jar, &grant);
            let body = SignUpResponse {
                user: grant.user,
                confirmation_required: false,
            };
            (StatusCode::CREATED, jar, Json(body)).into_response()
        }
        SignUpOutcome::PendingConfirmation(user) => {
            let body = SignUpResponse {
                user,
                confirmation_required: true,
            };
            (StatusCode::CREATED, Json(body)).into_response()
        }
    };

    Ok(response)
}

/// sign_out
///
/// [Auth API] Revokes the session at the backend and clears the cookies. The token sent
/// for revocation is the one the route guard resolved, so a session refreshed on this
/// very request is the one revoked. Revocation failures are logged only; the local
/// session is dropped regardless.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses((status = 200, description = "Signed out", body = SignOutResponse))
)]
pub async fn sign_out(
    State(state): State<AppState>,
    tokens: Option<Extension<SessionTokens>>,
    jar: CookieJar,
) -> (CookieJar, Json<SignOutResponse>) {
    let cookies = &state.config.cookies;

    let access_token = match tokens {
        Some(Extension(tokens)) => Some(tokens.access_token),
        None => jar.get(&cookies.access_token).map(|c| c.value().to_string()),
    };
    if let Some(access_token) = access_token {
        if let Err(e) = state.auth.sign_out(&access_token).await {
            tracing::warn!(error = %e, "session revocation failed");
        }
    }

    let jar = cookies.clear(jar);
    let body = SignOutResponse {
        redirect_to: state.config.routes.after_logout.clone(),
    };
    (jar, Json(body))
}

/// get_me
///
/// [Authenticated Route] Returns the current user. Accepts the cookie session or a bearer token.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<SessionUser> {
    Json(user)
}

// --- Pages ---

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body data-page=\"{title}\">{body}</body></html>"
    ))
}

pub async fn landing_page(CurrentSession(user): CurrentSession) -> Html<String> {
    let call_to_action = match user {
        Some(_) => "<a href=\"/dashboard\">Open dashboard</a>",
        None => "<a href=\"/login\">Sign in</a>",
    };
    page("home", call_to_action)
}

pub async fn login_page() -> Html<String> {
    page("login", "<form id=\"sign-in\"></form>")
}

pub async fn signup_page() -> Html<String> {
    page("signup", "<form id=\"sign-up\"></form>")
}

pub async fn forgot_password_page() -> Html<String> {
    page("forgot-password", "<form id=\"forgot-password\"></form>")
}

pub async fn dashboard_page(AuthUser(user): AuthUser) -> Html<String> {
    let name = user.email.unwrap_or_else(|| user.id.to_string());
    page("dashboard", &format!("<h1>Welcome, {}</h1>", escape_html(&name)))
}

pub async fn settings_page(AuthUser(user): AuthUser) -> Html<String> {
    page(
        "settings",
        &format!("<p>Signed in as {}</p>", escape_html(&user.role)),
    )
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, page("not-found", "<p>Page not found</p>"))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
