//! Small helpers for contact validation, code generation, and bearer tokens.

use crate::token::TokenError;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use rand::{rngs::OsRng, Rng};
use regex::Regex;

pub(crate) const OTP_CODE_LENGTH: usize = 6;

/// Normalize a contact identifier for lookup/uniqueness checks.
pub(crate) fn normalize_contact(contact: &str) -> String {
    contact.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_contact(contact_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(contact_normalized))
}

/// Generate a fixed-length numeric code from OS randomness.
///
/// Uniqueness across concurrently live codes for the same contact is not
/// guaranteed; verification matches on the `{contact, code}` pair.
pub(crate) fn generate_otp_code() -> String {
    let code: u32 = OsRng.gen_range(0..1_000_000);
    format!("{code:0width$}", width = OTP_CODE_LENGTH)
}

/// Extract the bearer token from the `Authorization` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(TokenError::Missing)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(TokenError::Missing)
}
