//! DB-backed integration tests for the OTP authentication flows.
//!
//! Stands up a transient Postgres container, applies the schema, and drives
//! the handlers end to end: issuance rate limiting, single-use codes, expiry,
//! the attempt cap, signup-then-login bookkeeping, and concurrent
//! verification with exactly one winner.

mod support;

use anyhow::{Context, Result};
use axum::{
    body::to_bytes,
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lawjano::api::delivery::LogOtpSender;
use lawjano::api::handlers::auth::types::{
    GenerateOtpRequest, MeResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use lawjano::api::handlers::auth::{generate_otp, verify_otp, AuthConfig, AuthState};
use lawjano::api::handlers::me::me;
use lawjano::token::SessionKeys;
use secrecy::SecretString;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::sync::Arc;
use support::PostgresContainer;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const ISSUE_CAP: i64 = 5;
const ATTEMPT_CAP: i32 = 5;

fn auth_state() -> Arc<AuthState> {
    let keys = SessionKeys::new(&SecretString::from("integration-secret".to_string()), 3600);
    Arc::new(AuthState::new(
        AuthConfig::new()
            .with_otp_issue_cap(ISSUE_CAP)
            .with_otp_attempt_cap(ATTEMPT_CAP),
        Arc::new(LogOtpSender),
        keys,
    ))
}

async fn issue(pool: &PgPool, state: &Arc<AuthState>, contact: &str) -> Response {
    generate_otp(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(GenerateOtpRequest {
            contact: contact.to_string(),
            role: None,
        })),
    )
    .await
    .into_response()
}

async fn submit(pool: &PgPool, state: &Arc<AuthState>, contact: &str, code: &str) -> Response {
    verify_otp(
        Extension(pool.clone()),
        Extension(state.clone()),
        Some(Json(VerifyOtpRequest {
            contact: contact.to_string(),
            otp: code.to_string(),
            role: None,
        })),
    )
    .await
    .into_response()
}

/// The code under test is never returned to the caller, so fetch it the way
/// the delivery channel would have received it.
async fn latest_code(pool: &PgPool, contact: &str) -> Result<String> {
    let row = sqlx::query(
        "SELECT code FROM otp_codes WHERE contact = $1 AND used = FALSE ORDER BY created_at DESC LIMIT 1",
    )
    .bind(contact)
    .fetch_one(pool)
    .await
    .context("no live code for contact")?;
    Ok(row.get("code"))
}

fn wrong_code(code: &str) -> &'static str {
    if code == "000000" {
        "000001"
    } else {
        "000000"
    }
}

/// First successful verification creates the account and returns 403.
async fn signup(pool: &PgPool, state: &Arc<AuthState>, contact: &str) -> Result<()> {
    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;
    let response = submit(pool, state, contact, &code).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    Ok(())
}

/// Subsequent verifications log in and return a session token.
async fn login(pool: &PgPool, state: &Arc<AuthState>, contact: &str) -> Result<String> {
    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;
    let response = submit(pool, state, contact, &code).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let response: VerifyOtpResponse = serde_json::from_slice(&body)?;
    Ok(response.token)
}

async fn fetch_me(pool: &PgPool, state: &Arc<AuthState>, token: &str) -> Result<MeResponse> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    let response = me(headers, Extension(pool.clone()), Extension(state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn issuance_is_rate_limited(pool: &PgPool, state: &Arc<AuthState>) -> Result<()> {
    let contact = "ratelimit@example.com";
    for _ in 0..ISSUE_CAP {
        assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    }
    assert_eq!(
        issue(pool, state, contact).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    Ok(())
}

async fn response_never_echoes_the_code(pool: &PgPool, state: &Arc<AuthState>) -> Result<()> {
    let contact = "echo@example.com";
    let response = issue(pool, state, contact).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let body = String::from_utf8(body.to_vec())?;
    let code = latest_code(pool, contact).await?;
    assert!(!body.contains(&code), "issuance response leaked the code");
    Ok(())
}

async fn a_code_is_single_use(pool: &PgPool, state: &Arc<AuthState>) -> Result<()> {
    let contact = "singleuse@example.com";
    signup(pool, state, contact).await?;

    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;
    assert_eq!(
        submit(pool, state, contact, &code).await.status(),
        StatusCode::OK
    );
    // Spent codes behave like unknown ones.
    assert_eq!(
        submit(pool, state, contact, &code).await.status(),
        StatusCode::BAD_REQUEST
    );
    Ok(())
}

async fn expired_codes_are_rejected(pool: &PgPool, state: &Arc<AuthState>) -> Result<()> {
    let contact = "expiry@example.com";
    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;

    sqlx::query("UPDATE otp_codes SET expires_at = NOW() - INTERVAL '1 second' WHERE contact = $1")
        .bind(contact)
        .execute(pool)
        .await?;

    assert_eq!(
        submit(pool, state, contact, &code).await.status(),
        StatusCode::BAD_REQUEST
    );
    Ok(())
}

async fn attempt_cap_purges_and_fresh_code_recovers(
    pool: &PgPool,
    state: &Arc<AuthState>,
) -> Result<()> {
    let contact = "attempts@example.com";
    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;
    let wrong = wrong_code(&code);

    for _ in 0..ATTEMPT_CAP - 1 {
        assert_eq!(
            submit(pool, state, contact, wrong).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
    // Exhausting the cap purges every code the contact has.
    assert_eq!(
        submit(pool, state, contact, wrong).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        submit(pool, state, contact, &code).await.status(),
        StatusCode::BAD_REQUEST
    );

    // A fresh code starts over with a clean attempt counter.
    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let fresh = latest_code(pool, contact).await?;
    assert_eq!(
        submit(pool, state, contact, &fresh).await.status(),
        StatusCode::FORBIDDEN
    );
    Ok(())
}

async fn signup_then_login_advances_the_account(
    pool: &PgPool,
    state: &Arc<AuthState>,
) -> Result<()> {
    let contact = "account@example.com";
    signup(pool, state, contact).await?;

    let token = login(pool, state, contact).await?;
    let account = fetch_me(pool, state, &token).await?;
    assert_eq!(account.contact, contact);
    assert_eq!(account.login_count, 1);
    assert!(account.last_login_at.is_some());

    let token = login(pool, state, contact).await?;
    let account = fetch_me(pool, state, &token).await?;
    assert_eq!(account.login_count, 2);
    Ok(())
}

async fn concurrent_verification_has_one_winner(
    pool: &PgPool,
    state: &Arc<AuthState>,
) -> Result<()> {
    let contact = "concurrent@example.com";
    signup(pool, state, contact).await?;

    assert_eq!(issue(pool, state, contact).await.status(), StatusCode::OK);
    let code = latest_code(pool, contact).await?;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let pool = pool.clone();
        let state = state.clone();
        let contact = contact.to_string();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            submit(&pool, &state, &contact, &code).await.status()
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await?);
    }
    statuses.sort();

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);
    Ok(())
}

#[tokio::test]
async fn otp_flows_against_postgres() -> Result<()> {
    if let Err(err) = support::ensure_container_runtime() {
        eprintln!("Skipping integration test: {err}");
        return Ok(());
    }

    let postgres = PostgresContainer::start().await?;
    postgres.wait_until_ready().await?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&postgres.dsn())
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .context("Failed to apply schema")?;

    let state = auth_state();

    issuance_is_rate_limited(&pool, &state).await?;
    response_never_echoes_the_code(&pool, &state).await?;
    a_code_is_single_use(&pool, &state).await?;
    expired_codes_are_rejected(&pool, &state).await?;
    attempt_cap_purges_and_fresh_code_recovers(&pool, &state).await?;
    signup_then_login_advances_the_account(&pool, &state).await?;
    concurrent_verification_has_one_winner(&pool, &state).await?;

    Ok(())
}
