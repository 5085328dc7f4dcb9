//! Session token issuance and validation.
//!
//! Tokens are stateless HS256 JWTs binding a contact identifier to an expiry
//! instant. They are verified by signature and expiry only; nothing is stored
//! server-side. The signing secret comes from a key file created on first run
//! (see [`keyfile`]).

pub mod keyfile;

use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing or invalid token.")]
    Missing,
    #[error("Invalid token.")]
    Invalid,
    #[error("Token expired.")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: u64,
}

/// Signing and verification state for session tokens.
///
/// Built once at startup and shared read-only across all requests.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime_seconds: u64,
}

impl SessionKeys {
    #[must_use]
    pub fn new(secret: &SecretString, lifetime_seconds: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime_seconds: u64::try_from(lifetime_seconds).unwrap_or(0),
        }
    }

    /// Mint a signed token bound to `contact`, expiring after the configured
    /// lifetime.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint(&self, contact: &str) -> Result<String> {
        let claims = Claims {
            sub: contact.to_string(),
            exp: get_current_timestamp() + self.lifetime_seconds,
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign session token")
    }

    /// Validate a token and return the contact identifier it was minted for.
    ///
    /// # Errors
    /// `Expired` when the expiry has passed, `Invalid` for any other
    /// signature or format failure.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }
}
