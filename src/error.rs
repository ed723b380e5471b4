use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Client-visible rejection. Messages are fixed categories; provider or
/// internal details never reach the body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid authentication credentials")]
    Unauthenticated,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "detail": self.to_string() }));
        let mut res = (status, body).into_response();

        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated => {
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            ApiError::RateLimited { retry_after_secs } => {
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }
        res
    }
}

/// Token verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token signature, algorithm or payload is invalid")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token subject is missing")]
    UnknownSubject,
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthenticated
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Sector must be alphabetic and at least {min_len} characters long.")]
    InvalidSector { min_len: usize },
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

/// Failure of an external collaborator. Never surfaced to callers; absorbed
/// into a degraded report.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: &'static str, secs: u64 },

    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} returned a malformed response: {message}")]
    Malformed { provider: &'static str, message: String },

    #[error("{provider} returned no results")]
    Empty { provider: &'static str },
}
