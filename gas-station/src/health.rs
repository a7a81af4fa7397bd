//! Liveness endpoint.

use axum::{http::header, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
}

/// Liveness check. Returns 200 while the server is up.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    security([]),
    responses(
        (status = 200, description = "Server is alive", body = HealthResponse)
    )
)]
pub async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}
