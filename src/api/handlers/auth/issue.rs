//! OTP issuance endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::error::AuthError;
use super::state::AuthState;
use super::storage;
use super::types::{GenerateOtpRequest, GenerateOtpResponse};
use super::utils::{generate_otp_code, normalize_contact, valid_contact};
use crate::api::delivery::OtpMessage;

/// Generate a one-time code and hand it to the delivery channel.
#[utoipa::path(
    post,
    path = "/generate-otp",
    request_body = GenerateOtpRequest,
    responses(
        (status = 200, description = "OTP generated", body = GenerateOtpResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload or invalid contact", body = String),
        (status = 429, description = "Issuance cap reached for this contact", body = String),
        (status = 503, description = "Storage unavailable", body = String)
    ),
    tag = "auth"
)]
pub async fn generate_otp(
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<GenerateOtpRequest>>,
) -> impl IntoResponse {
    let request: GenerateOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let contact = normalize_contact(&request.contact);
    if !valid_contact(&contact) {
        return (StatusCode::BAD_REQUEST, "Invalid contact".to_string()).into_response();
    }

    // The contact doubles as the delivery target: codes go to the email
    // being authenticated.
    match issue(&pool, &state, &contact, Some(&contact)).await {
        Ok(_) => {
            debug!(%contact, "otp issued");
            // The code is never echoed to the caller.
            let response = GenerateOtpResponse {
                message: "OTP generated successfully".to_string(),
                contact,
                role: request.role,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Issue a code for `contact`: housekeeping, rate limit, persist, deliver.
///
/// Delivery failure is logged and does not roll back the persisted record;
/// the code stays valid either way. The code itself never leaves this
/// function except through the delivery channel.
pub(super) async fn issue(
    pool: &PgPool,
    state: &AuthState,
    contact: &str,
    delivery_target: Option<&str>,
) -> Result<(), AuthError> {
    storage::purge_expired(pool, contact)
        .await
        .map_err(AuthError::Storage)?;

    let ttl_seconds = state.config().otp_ttl_seconds();
    let recent = storage::count_recent(pool, contact, ttl_seconds)
        .await
        .map_err(AuthError::Storage)?;
    if recent >= state.config().otp_issue_cap() {
        return Err(AuthError::RateLimitExceeded);
    }

    let code = generate_otp_code();
    storage::insert_code(pool, contact, &code, ttl_seconds)
        .await
        .map_err(AuthError::Storage)?;

    match delivery_target {
        Some(target) => {
            let message = OtpMessage {
                to: target.to_string(),
                code,
            };
            if let Err(err) = state.sender().send(&message) {
                error!(%contact, "otp delivery failed: {err:#}");
            }
        }
        None => error!(%contact, "no delivery target for otp"),
    }

    Ok(())
}
