use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, config::CookieSettings, policy::Decision, session};

/// route_guard
///
/// Outermost application middleware. For every request it:
/// 1. refreshes the cookie session through the auth backend;
/// 2. evaluates the route policy for the request path and the resulting auth status;
/// 3. either redirects (307) or runs the inner service with the resolved `SessionUser`
///    and its `SessionTokens` in the request extensions.
///
/// The refreshed session cookies are attached to whichever response leaves the guard,
/// redirects included, unless the handler already wrote the session cookies itself.
/// A failing backend short-circuits with 502 before the policy runs.
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let refreshed = match session::refresh_session(state.auth.as_ref(), &state.config, jar).await
    {
        Ok(refreshed) => refreshed,
        Err(e) => return e.into_response(),
    };

    let path = request.uri().path().to_string();
    let decision = state
        .config
        .routes
        .decide(&path, refreshed.is_authenticated());

    match decision {
        Decision::Allow => {
            if let Some(user) = refreshed.user {
                request.extensions_mut().insert(user);
            }
            if let Some(tokens) = refreshed.tokens {
                request.extensions_mut().insert(tokens);
            }
            let response = next.run(request).await;
            // Handlers that sign in or out own the session cookies for this response.
            if sets_session_cookie(&response, &state.config.cookies) {
                return response;
            }
            (refreshed.jar, response).into_response()
        }
        Decision::Redirect(target) => {
            let location = target.location();
            tracing::debug!(
                %path,
                %location,
                authenticated = refreshed.user.is_some(),
                "route guard redirect"
            );
            (refreshed.jar, Redirect::temporary(&location)).into_response()
        }
    }
}

fn sets_session_cookie(response: &Response, cookies: &CookieSettings) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| {
            [&cookies.access_token, &cookies.refresh_token]
                .iter()
                .any(|name| value.starts_with(&format!("{}=", name)))
        })
}
