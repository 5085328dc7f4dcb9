//! Error taxonomy for the auth flows.
//!
//! Storage and delivery failures never reach the caller raw: sqlx errors are
//! wrapped into `Storage`, delivery failures are logged at the issuance site
//! and swallowed. `SignupComplete` is a control outcome rather than a fault;
//! it rides the error channel because it also terminates the request early.

use crate::token::TokenError;
use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Too many OTP requests. Please try again later.")]
    RateLimitExceeded,
    #[error("Too many invalid OTP attempts. Please request a new OTP.")]
    TooManyAttempts,
    #[error("Invalid or expired OTP.")]
    InvalidOrExpiredCode,
    #[error("Signup successful. Please login to continue.")]
    SignupComplete,
    #[error("{0}")]
    Unauthorized(#[from] TokenError),
    #[error("Storage unavailable.")]
    Storage(anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded | Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            Self::SignupComplete => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        if let Self::Storage(err) = &self {
            error!("storage failure: {err:#}");
        }
        (self.status(), self.to_string()).into_response()
    }
}
