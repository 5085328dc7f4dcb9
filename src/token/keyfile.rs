//! File-backed signing key with explicit first-run behavior.
//!
//! The key is generated once and persisted so session tokens stay valid
//! across restarts: if the file exists it is loaded, otherwise 64 random
//! bytes are hex-encoded and written before first use.

use anyhow::{bail, Context, Result};
use rand::{rngs::OsRng, RngCore};
use secrecy::SecretString;
use std::fmt::Write as _;
use std::{fs, path::Path};

const KEY_BYTES: usize = 64;

/// Load the signing secret from `path`, generating and persisting a new one
/// if the file does not exist.
///
/// # Errors
/// Returns an error when the file cannot be read or written, or when an
/// existing file is empty.
pub fn load_or_generate(path: &Path) -> Result<SecretString> {
    if path.exists() {
        let secret = fs::read_to_string(path)
            .with_context(|| format!("failed to read signing key from {}", path.display()))?;
        let secret = secret.trim();
        if secret.is_empty() {
            bail!("signing key file {} is empty", path.display());
        }
        return Ok(SecretString::from(secret.to_string()));
    }

    let mut bytes = [0u8; KEY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate signing key")?;

    let secret = bytes.iter().fold(
        String::with_capacity(KEY_BYTES * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    );

    fs::write(path, &secret)
        .with_context(|| format!("failed to persist signing key to {}", path.display()))?;

    Ok(SecretString::from(secret))
}
