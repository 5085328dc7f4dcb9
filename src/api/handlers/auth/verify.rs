//! OTP verification endpoint.

use anyhow::Context;
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::state::AuthState;
use super::storage;
use super::types::{VerifyOtpRequest, VerifyOtpResponse};
use super::utils::{normalize_contact, valid_contact};

/// Verify a submitted code and either complete signup or log the account in.
#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Login successful", body = VerifyOtpResponse, content_type = "application/json"),
        (status = 400, description = "Invalid or expired code", body = String),
        (status = 403, description = "Signup complete, authenticate again to log in", body = String),
        (status = 429, description = "Attempt cap exhausted, all codes purged", body = String),
        (status = 503, description = "Storage unavailable", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let contact = normalize_contact(&request.contact);
    if !valid_contact(&contact) {
        return (StatusCode::BAD_REQUEST, "Invalid contact".to_string()).into_response();
    }

    match verify(&pool, &state, &contact, request.otp.trim()).await {
        Ok(token) => {
            info!(%contact, "login successful");
            let response = VerifyOtpResponse {
                message: "Login successful".to_string(),
                token,
                contact,
                role: request.role,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Verify `code` for `contact` inside one transaction.
///
/// The match-and-mark-used step is a single conditional update, so a code
/// can be spent at most once even under concurrent submissions. On a miss,
/// the newest record's attempt counter is bumped; reaching the attempt cap
/// purges every code the contact has.
pub(super) async fn verify(
    pool: &PgPool,
    state: &AuthState,
    contact: &str,
    code: &str,
) -> Result<String, AuthError> {
    let mut tx = pool
        .begin()
        .await
        .context("begin verify transaction")
        .map_err(AuthError::Storage)?;

    let matched = storage::consume_code(&mut tx, contact, code)
        .await
        .map_err(AuthError::Storage)?;

    let Some(_record_id) = matched else {
        let outcome = match storage::record_failed_attempt(&mut tx, contact)
            .await
            .map_err(AuthError::Storage)?
        {
            Some(attempts) if attempts >= state.config().otp_attempt_cap() => {
                storage::purge_contact(&mut tx, contact)
                    .await
                    .map_err(AuthError::Storage)?;
                AuthError::TooManyAttempts
            }
            _ => AuthError::InvalidOrExpiredCode,
        };
        tx.commit()
            .await
            .context("commit failed-attempt bookkeeping")
            .map_err(AuthError::Storage)?;
        return Err(outcome);
    };

    let account = storage::lookup_account(&mut tx, contact)
        .await
        .map_err(AuthError::Storage)?;

    match account {
        None => {
            // First registration: create the account but issue no token; the
            // caller must authenticate again to log in.
            storage::insert_account(&mut tx, contact)
                .await
                .map_err(AuthError::Storage)?;
            tx.commit()
                .await
                .context("commit signup transaction")
                .map_err(AuthError::Storage)?;
            Err(AuthError::SignupComplete)
        }
        Some(_) => {
            storage::record_login(&mut tx, contact)
                .await
                .map_err(AuthError::Storage)?;
            // Mint before commit so a signing failure rolls the login back.
            let token = state.keys().mint(contact).map_err(AuthError::Storage)?;
            tx.commit()
                .await
                .context("commit login transaction")
                .map_err(AuthError::Storage)?;
            Ok(token)
        }
    }
}
