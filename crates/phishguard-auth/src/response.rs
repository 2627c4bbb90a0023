//! HTTP response mapping.
//!
//! Implements `IntoResponse` for [`AuthError`] and [`AuthOutcome`] so
//! routing layers can return them directly:
//!
//! - tokens: `200` with the [`TokenSet`](crate::challenge::TokenSet) JSON
//! - challenge: `200` with `{challengeName, session, username, expiresAt}`
//! - errors: status by kind with `{error, message}`, where `message` is
//!   [`AuthError::public_message`]

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::challenge::AuthOutcome;
use crate::error::AuthError;

/// Error body sent to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl From<&AuthError> for ErrorBody {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.error_code(),
            message: err.public_message(),
        }
    }
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::MissingOrg
            | Self::CodeMismatch
            | Self::CodeExpired
            | Self::InvalidPassword { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials { .. }
            | Self::ChallengeExpired
            | Self::TokenInvalid { .. }
            | Self::TokenExpired
            | Self::UnknownKey { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Misconfigured { .. }
            | Self::UnsupportedChallenge { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "Request failed");
        } else {
            tracing::debug!(error = %self, code = self.error_code(), "Request rejected");
        }

        let mut response = (status, Json(ErrorBody::from(&self))).into_response();

        if self.is_token_error() {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }

        response
    }
}

impl IntoResponse for AuthOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Authenticated(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
            Self::Challenge(session) => (StatusCode::OK, Json(session)).into_response(),
        }
    }
}
