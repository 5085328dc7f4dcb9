//! OTP delivery channel.
//!
//! Issuance hands the generated code to an [`OtpSender`]; the sender decides
//! how to deliver it (SMTP relay in production, log output for local dev) and
//! returns `Ok`/`Err`. Delivery failure is logged by the caller and never
//! fails issuance: the persisted code stays valid either way.

use anyhow::{Context, Result};
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// SMTP relay settings for OTP delivery.
#[derive(Debug, Clone)]
pub struct SmtpOptions {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct OtpMessage {
    pub to: String,
    pub code: String,
}

/// Delivery abstraction for one-time codes.
pub trait OtpSender: Send + Sync {
    /// Deliver a code or return an error so the caller can log the failure.
    fn send(&self, message: &OtpMessage) -> Result<()>;
}

/// Local dev sender that logs the code instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogOtpSender;

impl OtpSender for LogOtpSender {
    fn send(&self, message: &OtpMessage) -> Result<()> {
        info!(to = %message.to, code = %message.code, "otp delivery stub");
        Ok(())
    }
}

/// SMTP relay sender used in production.
pub struct SmtpOtpSender {
    mailer: SmtpTransport,
    from: String,
}

impl SmtpOtpSender {
    /// Build the relay transport with the configured credentials.
    ///
    /// # Errors
    /// Returns an error if the relay host cannot be resolved into a
    /// transport.
    pub fn new(options: &SmtpOptions) -> Result<Self> {
        let credentials = Credentials::new(
            options.username.clone(),
            options.password.expose_secret().to_string(),
        );

        let mailer = SmtpTransport::relay(&options.host)
            .with_context(|| format!("invalid SMTP relay host: {}", options.host))?
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from: options.from.clone(),
        })
    }
}

impl OtpSender for SmtpOtpSender {
    fn send(&self, message: &OtpMessage) -> Result<()> {
        let body = format!(
            "Your OTP code for LawJano Dashboard is: {}\n\n\
             Do not share this OTP with anyone. If you did not request this, please ignore this email.",
            message.code
        );

        let email = Message::builder()
            .from(self.from.parse().context("invalid sender address")?)
            .to(message.to.parse().context("invalid recipient address")?)
            .subject("Your OTP for LawJano Dashboard (Do not share)")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("failed to build OTP email")?;

        self.mailer.send(&email).context("failed to send OTP email")?;

        Ok(())
    }
}
