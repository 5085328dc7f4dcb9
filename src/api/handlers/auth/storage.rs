//! Database helpers for the OTP ledger and the credential store.
//!
//! The verifier's match-then-mark-used step is a single conditional `UPDATE`
//! so two concurrent submissions of the same valid code can never both
//! succeed: the second one re-evaluates `used = FALSE` under the row lock and
//! matches nothing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::Instrument;
use uuid::Uuid;

/// Minimal account fields surfaced to the handlers.
pub(crate) struct AccountRecord {
    pub(crate) contact: String,
    pub(crate) last_login_at: Option<DateTime<Utc>>,
    pub(crate) login_count: i64,
}

/// Delete the contact's already-expired codes (issuance housekeeping).
pub(super) async fn purge_expired(pool: &PgPool, contact: &str) -> Result<u64> {
    let query = "DELETE FROM otp_codes WHERE contact = $1 AND expires_at < NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(contact)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired otp codes")?;
    Ok(result.rows_affected())
}

/// Count codes issued to the contact within the last TTL window.
pub(super) async fn count_recent(pool: &PgPool, contact: &str, ttl_seconds: i64) -> Result<i64> {
    let query = r"
        SELECT COUNT(*) AS count
        FROM otp_codes
        WHERE contact = $1
          AND created_at > NOW() - ($2 * INTERVAL '1 second')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .bind(ttl_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count recent otp codes")?;
    Ok(row.get("count"))
}

/// Persist a freshly generated code with attempt counter 0.
pub(super) async fn insert_code(
    pool: &PgPool,
    contact: &str,
    code: &str,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO otp_codes (contact, code, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(contact)
        .bind(code)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert otp code")?;
    Ok(())
}

/// Atomically match and mark a code as used.
///
/// Returns the matched record id, or `None` when no live `{contact, code}`
/// pair exists. The newest matching record wins when duplicates are live.
pub(super) async fn consume_code(
    tx: &mut Transaction<'_, Postgres>,
    contact: &str,
    code: &str,
) -> Result<Option<Uuid>> {
    let query = r"
        UPDATE otp_codes
        SET used = TRUE
        WHERE used = FALSE
          AND id = (
            SELECT id
            FROM otp_codes
            WHERE contact = $1
              AND code = $2
              AND used = FALSE
              AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
          )
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .bind(code)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume otp code")?;
    Ok(row.map(|row| row.get("id")))
}

/// Bump the attempt counter on the contact's most recent code.
///
/// Returns the new counter value, or `None` when the contact has no codes at
/// all.
pub(super) async fn record_failed_attempt(
    tx: &mut Transaction<'_, Postgres>,
    contact: &str,
) -> Result<Option<i32>> {
    let query = r"
        UPDATE otp_codes
        SET attempts = attempts + 1
        WHERE id = (
            SELECT id
            FROM otp_codes
            WHERE contact = $1
            ORDER BY created_at DESC
            LIMIT 1
        )
        RETURNING attempts
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to record otp attempt")?;
    Ok(row.map(|row| row.get("attempts")))
}

/// Delete every code for the contact (attempt cap reached).
pub(super) async fn purge_contact(tx: &mut Transaction<'_, Postgres>, contact: &str) -> Result<u64> {
    let query = "DELETE FROM otp_codes WHERE contact = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(contact)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to purge otp codes")?;
    Ok(result.rows_affected())
}

pub(super) async fn lookup_account(
    tx: &mut Transaction<'_, Postgres>,
    contact: &str,
) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT contact, last_login_at, login_count
        FROM accounts
        WHERE contact = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to lookup account")?;
    Ok(row.map(|row| AccountRecord {
        contact: row.get("contact"),
        last_login_at: row.get("last_login_at"),
        login_count: row.get("login_count"),
    }))
}

/// Create the account on first successful verification.
///
/// A unique violation means a concurrent verification created it first;
/// both requests then report signup-complete, which is the intended outcome.
pub(super) async fn insert_account(
    tx: &mut Transaction<'_, Postgres>,
    contact: &str,
) -> Result<()> {
    let query = "INSERT INTO accounts (contact) VALUES ($1)";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(contact)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Ok(()),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

/// Advance last-login and the login counter on a successful login.
pub(super) async fn record_login(tx: &mut Transaction<'_, Postgres>, contact: &str) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET last_login_at = NOW(),
            login_count = login_count + 1
        WHERE contact = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(contact)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to record login")?;
    Ok(())
}

/// Account lookup for the authenticated surface.
pub(crate) async fn fetch_account(pool: &PgPool, contact: &str) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT contact, last_login_at, login_count
        FROM accounts
        WHERE contact = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(contact)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch account")?;
    Ok(row.map(|row| AccountRecord {
        contact: row.get("contact"),
        last_login_at: row.get("last_login_at"),
        login_count: row.get("login_count"),
    }))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
