pub mod server;

use std::path::PathBuf;

pub use crate::api::delivery::SmtpOptions;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        secret_path: PathBuf,
        otp_ttl_seconds: i64,
        otp_issue_cap: i64,
        otp_attempt_cap: i32,
        session_ttl_seconds: i64,
        smtp: Option<SmtpOptions>,
    },
}
