use axum::response::{IntoResponse, Json};
use serde_json::json;

/// Liveness banner.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", content_type = "application/json")
    ),
    tag = "health"
)]
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Legal Question Answering API is up and running",
    }))
}
