use crate::api::{
    self,
    delivery::{LogOtpSender, OtpSender, SmtpOtpSender},
    handlers::auth::{AuthConfig, AuthState},
};
use crate::cli::actions::Action;
use crate::token::{keyfile, SessionKeys};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            secret_path,
            otp_ttl_seconds,
            otp_issue_cap,
            otp_attempt_cap,
            session_ttl_seconds,
            smtp,
        } => {
            // Fail early on a malformed DSN instead of at pool connect time.
            let dsn = Url::parse(&dsn).context("Invalid database DSN")?;

            let secret = keyfile::load_or_generate(&secret_path).with_context(|| {
                format!("Failed to initialize signing key at {}", secret_path.display())
            })?;
            let keys = SessionKeys::new(&secret, session_ttl_seconds);

            let sender: Arc<dyn OtpSender> = match smtp {
                Some(options) => Arc::new(
                    SmtpOtpSender::new(&options).context("Failed to build SMTP transport")?,
                ),
                None => {
                    warn!("No SMTP relay configured, OTP codes will only be logged");
                    Arc::new(LogOtpSender)
                }
            };

            let config = AuthConfig::new()
                .with_otp_ttl_seconds(otp_ttl_seconds)
                .with_otp_issue_cap(otp_issue_cap)
                .with_otp_attempt_cap(otp_attempt_cap);

            let state = Arc::new(AuthState::new(config, sender, keys));

            api::new(port, dsn.to_string(), state).await?;
        }
    }

    Ok(())
}
