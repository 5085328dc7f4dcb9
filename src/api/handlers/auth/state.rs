//! Auth configuration and shared request state.

use crate::api::delivery::OtpSender;
use crate::token::SessionKeys;
use std::sync::Arc;

const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_OTP_ISSUE_CAP: i64 = 5;
const DEFAULT_OTP_ATTEMPT_CAP: i32 = 5;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    otp_ttl_seconds: i64,
    otp_issue_cap: i64,
    otp_attempt_cap: i32,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            otp_issue_cap: DEFAULT_OTP_ISSUE_CAP,
            otp_attempt_cap: DEFAULT_OTP_ATTEMPT_CAP,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_issue_cap(mut self, cap: i64) -> Self {
        self.otp_issue_cap = cap;
        self
    }

    #[must_use]
    pub fn with_otp_attempt_cap(mut self, cap: i32) -> Self {
        self.otp_attempt_cap = cap;
        self
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn otp_issue_cap(&self) -> i64 {
        self.otp_issue_cap
    }

    #[must_use]
    pub fn otp_attempt_cap(&self) -> i32 {
        self.otp_attempt_cap
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the auth handlers share per request: limits, the delivery
/// channel, and the session signing keys (read-only after startup).
pub struct AuthState {
    config: AuthConfig,
    sender: Arc<dyn OtpSender>,
    keys: SessionKeys,
}

impl AuthState {
    pub fn new(config: AuthConfig, sender: Arc<dyn OtpSender>, keys: SessionKeys) -> Self {
        Self {
            config,
            sender,
            keys,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn sender(&self) -> &dyn OtpSender {
        self.sender.as_ref()
    }

    #[must_use]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }
}
