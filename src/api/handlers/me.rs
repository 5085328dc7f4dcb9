//! Authenticated account endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::handlers::auth::{
    storage,
    types::MeResponse,
    utils::bearer_token,
    AuthError, AuthState,
};

/// Return the account behind the presented session token.
#[utoipa::path(
    get,
    path = "/me",
    params(
        ("Authorization" = String, Header, description = "Bearer session token")
    ),
    responses(
        (status = 200, description = "Account information", body = MeResponse, content_type = "application/json"),
        (status = 401, description = "Missing, invalid, or expired token", body = String),
        (status = 503, description = "Storage unavailable", body = String)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(err) => return AuthError::Unauthorized(err).into_response(),
    };

    let contact = match state.keys().validate(token) {
        Ok(contact) => contact,
        Err(err) => return AuthError::Unauthorized(err).into_response(),
    };

    match storage::fetch_account(&pool, &contact).await {
        Ok(Some(account)) => Json(MeResponse {
            contact: account.contact,
            last_login_at: account.last_login_at,
            login_count: account.login_count,
        })
        .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Account not found.".to_string()).into_response(),
        Err(err) => AuthError::Storage(err).into_response(),
    }
}
