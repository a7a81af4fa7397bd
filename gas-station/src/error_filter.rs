//! Error translation for HTTP responses.
//!
//! Handlers return [`ApiError`]. Its response carries the underlying
//! [`HttpError`] as an extension, and [`translate_errors`] turns any such
//! response into the JSON [`ErrorBody`] with the request path filled in.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use gas_station_core::{ErrorBody, HttpError};
use tracing::error;

/// Error type returned by handlers.
#[derive(Debug, Clone)]
pub struct ApiError(pub HttpError);

impl<E> From<E> for ApiError
where
    E: Into<HttpError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// Get the wrapped error.
    pub fn inner(&self) -> &HttpError {
        &self.0
    }
}

fn status_of(err: &HttpError) -> StatusCode {
    StatusCode::from_u16(err.effective_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        // Path is filled in by `translate_errors`.
        let mut response = (status, Json(ErrorBody::new(&self.0, ""))).into_response();
        response.extensions_mut().insert(self.0);
        response
    }
}

/// Middleware rendering handler errors as [`ErrorBody`] and logging the
/// failed request.
pub async fn translate_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = redacted(request.headers());

    let response = next.run(request).await;
    let Some(err) = response.extensions().get::<HttpError>().cloned() else {
        return response;
    };

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let status = status_of(&err);

    error!(
        method = %method,
        uri = %uri,
        headers = ?headers,
        query = uri.query().unwrap_or(""),
        status = status.as_u16(),
        error = %err,
        "Request failed"
    );

    let mut translated = (status, Json(ErrorBody::new(&err, path))).into_response();
    // Keep headers set by the handler, but not its body metadata.
    for (name, value) in response.headers() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            translated.headers_mut().append(name.clone(), value.clone());
        }
    }
    translated.extensions_mut().insert(err);
    translated
}

fn redacted(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    for name in [header::AUTHORIZATION, header::COOKIE] {
        if headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static("[redacted]"));
        }
    }
    headers
}

/// Fallback for unmatched routes.
pub async fn route_not_found(request: Request) -> ApiError {
    ApiError(HttpError::not_found(format!(
        "Cannot {} {}",
        request.method(),
        request.uri().path()
    )))
}
