//! OTP authentication: issuance, verification, and session bootstrap.
//!
//! A contact requests a one-time code (`/generate-otp`), which is persisted
//! in the ledger and handed to the delivery channel. Submitting the code
//! (`/verify-otp`) either completes signup (first time, no token) or logs the
//! account in and mints a session token. Tokens then guard the authenticated
//! surface (`/me`).

mod error;
pub(crate) mod issue;
mod state;
pub(crate) mod storage;
pub mod types;
pub(crate) mod utils;
pub(crate) mod verify;

pub use error::AuthError;
pub use issue::generate_otp;
pub use state::{AuthConfig, AuthState};
pub use verify::verify_otp;
