//! OpenAPI document.
//!
//! [`ApiDoc`] registers the HTTP routes, the error body schema and two
//! bearer security schemes: `access-token` for users and `app` for
//! service-to-service calls. The document is served at `/docs-json` and
//! rendered by Swagger UI at `/docs`.

use crate::health::HealthResponse;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

/// Path of the JSON document.
pub const DOCS_JSON_PATH: &str = "/docs-json";

/// Path of the Swagger UI.
pub const DOCS_UI_PATH: &str = "/docs";

/// Bearer schemes registered on the document.
pub const BEARER_SCHEMES: [&str; 2] = ["access-token", "app"];

/// Schema of the JSON error body.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(as = ErrorBody)]
pub(crate) struct ErrorBodySchema {
    /// HTTP status code.
    status: u16,
    /// Error message or structured payload.
    #[schema(value_type = Object)]
    message: serde_json::Value,
    /// RFC 3339 UTC timestamp.
    timestamp: String,
    /// Request path, including the query string.
    path: String,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        for name in BEARER_SCHEMES {
            components.add_security_scheme(
                name,
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("Bearer")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI document for the HTTP API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(title = "Gas Station - API", description = "Gas Station - API"),
    external_docs(url = "/docs-json", description = "Download JSON"),
    paths(crate::health::health),
    components(schemas(HealthResponse, ErrorBodySchema)),
    tags((name = "health", description = "Liveness check"))
)]
pub struct ApiDoc;
