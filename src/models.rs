use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Claims;

// --- Session Schemas (Mirrored by the client store) ---

/// SessionUser
///
/// The identity resolved from a refreshed session. Inserted into the request extensions
/// by the route guard and serialized to the client as part of `SessionSnapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionUser {
    // Subject of the access token (auth.users.id).
    pub id: Uuid,
    pub email: Option<String>,
    // Postgres role carried by the token, normally 'authenticated'.
    pub role: String,
    // Expiry of the current access token.
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role.unwrap_or_else(|| "authenticated".to_string()),
            expires_at: Utc.timestamp_opt(claims.exp as i64, 0).single(),
        }
    }
}

impl From<&TokenGrant> for SessionUser {
    fn from(grant: &TokenGrant) -> Self {
        Self {
            id: grant.user.id,
            email: grant.user.email.clone(),
            role: grant
                .user
                .role
                .clone()
                .unwrap_or_else(|| "authenticated".to_string()),
            expires_at: grant.expires_at(),
        }
    }
}

/// SessionSnapshot
///
/// What the client-side auth store mirrors: a yes/no plus the user, if any.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub user: Option<SessionUser>,
}

impl From<Option<SessionUser>> for SessionSnapshot {
    fn from(user: Option<SessionUser>) -> Self {
        Self {
            is_authenticated: user.is_some(),
            user,
        }
    }
}

// --- Request/Response DTOs ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    /// Path to continue to after signing in (usually the `redirectTo` query value).
    #[serde(default)]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInResponse {
    pub user: SessionUser,
    pub redirect_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignUpResponse {
    pub user: AuthBackendUser,
    /// True when the backend requires email confirmation before a session is issued.
    pub confirmation_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignOutResponse {
    pub redirect_to: String,
}

// --- Auth Backend Payloads (Supabase GoTrue wire format) ---

/// AuthBackendUser
///
/// Minimal projection of the user object returned by the auth API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthBackendUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// TokenGrant
///
/// Access/refresh token pair issued by `/auth/v1/token` (password or refresh grant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    // Lifetime of the access token in seconds.
    pub expires_in: i64,
    // Absolute expiry as unix seconds. Older backends omit it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthBackendUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenGrant {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.expires_at {
            Some(at) => Utc.timestamp_opt(at, 0).single(),
            None => Some(Utc::now() + chrono::Duration::seconds(self.expires_in)),
        }
    }
}

/// SignUpOutcome
///
/// `/auth/v1/signup` answers with a full session when email confirmation is disabled,
/// and with the bare user object otherwise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(TokenGrant),
    PendingConfirmation(AuthBackendUser),
}
