use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// AuthError
///
/// Failures talking to the managed auth backend. The route policy itself cannot fail;
/// only the session refresh and the session API endpoints produce these.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The backend refused the request (4xx other than bad credentials).
    #[error("auth backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("auth backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth backend error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed auth backend response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Rejected { .. } => StatusCode::BAD_REQUEST,
            AuthError::Transport(_)
            | AuthError::Upstream { .. }
            | AuthError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "auth backend failure");
        } else {
            tracing::debug!(error = %self, "auth request refused");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
