use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::{
    auth,
    config::{AppConfig, CookieSettings},
    error::AuthError,
    models::{SessionUser, TokenGrant},
    supabase::AuthBackend,
};

/// SessionRefresh
///
/// Result of refreshing the cookie session for one request: the resolved user (if any)
/// and the cookie jar whose delta must be written onto the outgoing response.
#[derive(Debug)]
pub struct SessionRefresh {
    pub user: Option<SessionUser>,
    pub tokens: Option<SessionTokens>,
    pub jar: CookieJar,
}

/// SessionTokens
///
/// The live access token behind the resolved session: the cookie value when it was still
/// valid, or the freshly issued one after a refresh. The route guard places it in the
/// request extensions next to `SessionUser`.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
}

impl SessionRefresh {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl CookieSettings {
    fn build(&self, name: &str, value: String) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Duration::days(self.max_age_days))
            .build()
    }

    /// Writes both session cookies for a freshly issued token pair.
    pub fn write(&self, jar: CookieJar, grant: &TokenGrant) -> CookieJar {
        jar.add(self.build(&self.access_token, grant.access_token.clone()))
            .add(self.build(&self.refresh_token, grant.refresh_token.clone()))
    }

    /// Expires whichever session cookies the client sent.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut jar = jar;
        for name in [&self.access_token, &self.refresh_token] {
            if jar.get(name).is_some() {
                jar = jar.remove(Cookie::build((name.clone(), "")).path("/"));
            }
        }
        jar
    }
}

/// refresh_session
///
/// Resolves the visitor's session from the request cookies.
///
/// 1. A valid access-token cookie is accepted as-is (no backend call, no cookie change).
/// 2. Otherwise the refresh-token cookie is exchanged at the backend; on success both
///    cookies are rewritten, on rejection both are cleared.
/// 3. Without a refresh token the visitor is anonymous and stale cookies are cleared.
///
/// Backend outages are returned as errors rather than downgraded to "signed out".
pub async fn refresh_session(
    backend: &dyn AuthBackend,
    config: &AppConfig,
    jar: CookieJar,
) -> Result<SessionRefresh, AuthError> {
    let cookies = &config.cookies;

    if let Some(access) = jar.get(&cookies.access_token) {
        match auth::verify_access_token(access.value(), &config.jwt_secret) {
            Ok(claims) => {
                let tokens = SessionTokens {
                    access_token: access.value().to_string(),
                };
                return Ok(SessionRefresh {
                    user: Some(SessionUser::from(claims)),
                    tokens: Some(tokens),
                    jar,
                });
            }
            Err(e) => tracing::debug!(error = %e, "access token not usable, trying refresh"),
        }
    }

    let Some(refresh_token) = jar
        .get(&cookies.refresh_token)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(SessionRefresh {
            user: None,
            tokens: None,
            jar: cookies.clear(jar),
        });
    };

    match backend.refresh_session(&refresh_token).await? {
        Some(grant) => {
            let user = SessionUser::from(&grant);
            tracing::debug!(user_id = %user.id, "session refreshed");
            let jar = cookies.write(jar, &grant);
            Ok(SessionRefresh {
                user: Some(user),
                tokens: Some(SessionTokens {
                    access_token: grant.access_token,
                }),
                jar,
            })
        }
        None => {
            tracing::debug!("refresh token rejected, clearing session cookies");
            Ok(SessionRefresh {
                user: None,
                tokens: None,
                jar: cookies.clear(jar),
            })
        }
    }
}
