use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth,
    error::AuthError,
    models::{AuthBackendUser, SignUpOutcome, TokenGrant},
};

// 1. AuthBackend Contract
/// AuthBackend
///
/// Abstract contract for the managed auth service that owns session validity. The route
/// guard and the session API only talk to this trait, so the hosted client
/// (`SupabaseAuthClient`) can be swapped for the in-process `MockAuthBackend` in tests.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Trades a refresh token for a new token pair.
    ///
    /// Returns `Ok(None)` when the backend rejects the token (revoked, reused, expired):
    /// the caller treats the visitor as signed out. Transport failures, 5xx and refusals
    /// that are not about the token itself are errors.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Option<TokenGrant>, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// Revokes the session that `access_token` belongs to.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// AuthBackendState
///
/// The concrete type used to share the auth backend across the application state.
pub type AuthBackendState = Arc<dyn AuthBackend>;

// 2. The Real Implementation (Supabase GoTrue)
/// SupabaseAuthClient
///
/// Talks to `{SUPABASE_URL}/auth/v1`. Every call carries the project's anon key in the
/// `apikey` header; the connection pool is shared by all requests.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

/// Error body shapes used by the auth API across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> String {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }

    fn is_gateway_refusal(&self, status: StatusCode) -> bool {
        matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            && self.error.is_none()
            && self.error_code.is_none()
    }

    fn is_invalid_credentials(&self) -> bool {
        self.error_code.as_deref() == Some("invalid_credentials")
            || self.error.as_deref() == Some("invalid_grant")
    }
}

impl SupabaseAuthClient {
    /// new
    ///
    /// Builds the HTTP client with a 10-second request timeout.
    pub fn new(supabase_url: &str, anon_key: &str) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        })
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<Response, AuthError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    async fn error_body(response: Response) -> ErrorBody {
        response.json::<ErrorBody>().await.unwrap_or_default()
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuthClient {
    async fn refresh_session(&self, refresh_token: &str) -> Result<Option<TokenGrant>, AuthError> {
        let response = self
            .post_json(
                "/token?grant_type=refresh_token",
                json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = Self::error_body(response).await;
            // 401/403 without an auth error code come from the API gateway (bad anon key),
            // not from a verdict on the refresh token.
            if body.is_gateway_refusal(status) {
                return Err(AuthError::Upstream {
                    status: status.as_u16(),
                    message: body.message(),
                });
            }
            tracing::debug!(%status, reason = %body.message(), "refresh token rejected");
            return Ok(None);
        }
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(AuthError::Upstream {
                status: status.as_u16(),
                message: body.message(),
            });
        }

        let grant = response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        Ok(Some(grant))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthError> {
        let response = self
            .post_json(
                "/token?grant_type=password",
                json!({ "email": email, "password": password }),
                None,
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(classify_failure(status, &body));
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post_json("/signup", json!({ "email": email, "password": password }), None)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            return Err(classify_failure(status, &body));
        }

        response
            .json::<SignUpOutcome>()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .post_json("/logout", json!({}), Some(access_token))
            .await?;

        let status = response.status();
        // An already-revoked session is as good as signed out.
        if status.is_success()
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::NOT_FOUND
        {
            return Ok(());
        }

        let body = Self::error_body(response).await;
        Err(classify_failure(status, &body))
    }
}

fn classify_failure(status: StatusCode, body: &ErrorBody) -> AuthError {
    if status.is_client_error() && body.is_invalid_credentials() {
        AuthError::InvalidCredentials
    } else if status.is_client_error() {
        AuthError::Rejected {
            status: status.as_u16(),
            message: body.message(),
        }
    } else {
        AuthError::Upstream {
            status: status.as_u16(),
            message: body.message(),
        }
    }
}

// 3. The Mock Implementation (For Tests and Local Demos)
/// MockAuthBackend
///
/// In-process auth backend with a single known account. Issues real HS256 access tokens
/// signed with `jwt_secret`, so the route guard verifies them exactly like hosted ones.
pub struct MockAuthBackend {
    pub user: AuthBackendUser,
    pub password: String,
    pub refresh_token: String,
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    /// When true, every operation fails as if the backend were down.
    pub should_fail: bool,
    /// When true, sign-up returns the user without a session.
    pub require_confirmation: bool,
    refresh_calls: AtomicUsize,
    revoked_tokens: Mutex<Vec<String>>,
}

impl MockAuthBackend {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            user: AuthBackendUser {
                id: Uuid::from_u128(1),
                email: Some("demo@example.com".to_string()),
                role: Some("authenticated".to_string()),
            },
            password: "password123".to_string(),
            refresh_token: "mock-refresh-token".to_string(),
            jwt_secret: jwt_secret.to_string(),
            access_ttl_secs: 3600,
            should_fail: false,
            require_confirmation: false,
            refresh_calls: AtomicUsize::new(0),
            revoked_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn new_failing(jwt_secret: &str) -> Self {
        Self {
            should_fail: true,
            ..Self::new(jwt_secret)
        }
    }

    /// Sign-up answers without a session, as when email confirmation is enabled.
    pub fn requiring_confirmation(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Number of refresh-token exchanges served so far.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Access tokens passed to `sign_out`, oldest first.
    pub fn revoked_tokens(&self) -> Vec<String> {
        self.revoked_tokens
            .lock()
            .map(|tokens| tokens.clone())
            .unwrap_or_default()
    }

    /// grant_for
    ///
    /// Mints a token pair for `user`, the same shape the hosted backend returns.
    pub fn grant_for(&self, user: &AuthBackendUser) -> Result<TokenGrant, AuthError> {
        let (access_token, claims) =
            auth::issue_access_token(user, self.access_ttl_secs, &self.jwt_secret)
                .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        Ok(TokenGrant {
            access_token,
            refresh_token: self.refresh_token.clone(),
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl_secs as i64,
            expires_at: Some(claims.exp as i64),
            user: user.clone(),
        })
    }

    fn outage(&self) -> Result<(), AuthError> {
        if self.should_fail {
            return Err(AuthError::Upstream {
                status: 503,
                message: "Mock Auth Error: Simulation requested".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn refresh_session(&self, refresh_token: &str) -> Result<Option<TokenGrant>, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.outage()?;

        if refresh_token != self.refresh_token {
            return Ok(None);
        }
        self.grant_for(&self.user).map(Some)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthError> {
        self.outage()?;

        if self.user.email.as_deref() != Some(email) || self.password != password {
            return Err(AuthError::InvalidCredentials);
        }
        self.grant_for(&self.user)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        self.outage()?;

        if self.user.email.as_deref() == Some(email) {
            return Err(AuthError::Rejected {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let user = AuthBackendUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            role: Some("authenticated".to_string()),
        };
        if self.require_confirmation {
            return Ok(SignUpOutcome::PendingConfirmation(user));
        }
        self.grant_for(&user).map(SignUpOutcome::Session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.outage()?;

        if let Ok(mut revoked) = self.revoked_tokens.lock() {
            revoked.push(access_token.to_string());
        }
        Ok(())
    }
}
