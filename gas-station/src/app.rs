//! Router assembly.

use crate::docs::{ApiDoc, DOCS_JSON_PATH, DOCS_UI_PATH};
use crate::error_filter::{route_not_found, translate_errors};
use crate::health::health;
use crate::security::with_security_headers;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::get,
    Router,
};
use gas_station_retries::RetryingExecutor;
use gas_station_store::Repository;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared state handed to request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Outbound HTTP executor with retry support.
    pub http: Arc<RetryingExecutor>,
    /// Document repository.
    pub repository: Arc<dyn Repository>,
}

impl AppState {
    /// Create the state.
    pub fn new(http: RetryingExecutor, repository: Arc<dyn Repository>) -> Self {
        Self {
            http: Arc::new(http),
            repository,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("repository", &self.repository.collection())
            .finish_non_exhaustive()
    }
}

/// Build the application router.
///
/// Layers, outermost first: CORS, security headers, request tracing, body
/// limit, error translation.
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new(DOCS_UI_PATH).url(DOCS_JSON_PATH, ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(middleware::from_fn(translate_errors))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        );

    with_security_headers(router)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
