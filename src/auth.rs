use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, models::SessionUser};

/// Audience carried by access tokens issued to signed-in users.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims
///
/// The payload of a Supabase access token. Signed with the project's JWT secret and
/// verified locally on every request, so a valid token never costs a network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user in auth.users.
    pub sub: Uuid,
    /// Expiration Time (exp): unix seconds after which the token must be refreshed.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    /// Audience (aud): `authenticated` for user sessions.
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// verify_access_token
///
/// Decodes and validates an access token: HS256 signature, expiry and audience.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    decode::<Claims>(token, &decoding_key, &validation).map(|data| data.claims)
}

/// issue_access_token
///
/// Signs an access token for `user` valid for `ttl_secs`. Used by the in-process
/// auth backend; the hosted backend mints its own tokens.
pub fn issue_access_token(
    user: &crate::models::AuthBackendUser,
    ttl_secs: u64,
    secret: &str,
) -> Result<(String, Claims), Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();

    let claims = Claims {
        sub: user.id,
        exp: (now + ttl_secs) as usize,
        iat: now as usize,
        aud: AUTHENTICATED_AUDIENCE.to_string(),
        email: user.email.clone(),
        role: user.role.clone(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    let token = encode(&Header::new(Algorithm::HS256), &claims, &key)?;
    Ok((token, claims))
}

/// AuthUser
///
/// The resolved identity of an authenticated request, usable as a handler argument.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. The `SessionUser` the route guard placed in the request extensions after
///    refreshing the cookie session.
/// 2. A `Bearer` access token, for API clients that do not carry cookies.
///
/// Rejection: StatusCode::UNAUTHORIZED (401) when neither yields a user.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<SessionUser>() {
            return Ok(AuthUser(user.clone()));
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let config = AppConfig::from_ref(state);
        let claims = verify_access_token(token, &config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser(SessionUser::from(claims)))
    }
}

/// CurrentSession
///
/// Optional counterpart of `AuthUser`: never rejects, yields `None` for anonymous visitors.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(parts.extensions.get::<SessionUser>().cloned()))
    }
}
