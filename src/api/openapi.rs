//! OpenAPI document for the served routes.

use crate::api::handlers::{auth, health, me, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        auth::issue::generate_otp,
        auth::verify::verify_otp,
        me::me,
    ),
    components(schemas(
        auth::types::GenerateOtpRequest,
        auth::types::GenerateOtpResponse,
        auth::types::VerifyOtpRequest,
        auth::types::VerifyOtpResponse,
        auth::types::MeResponse,
    )),
    tags(
        (name = "auth", description = "OTP authentication and session issuance"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
