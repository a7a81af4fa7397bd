//! Single-shot HTTP transport.

use crate::error::RequestFailure;
use crate::executor::RetryingExecutor;
use crate::request::{HttpVerb, RequestSpec};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Raw response of a successful request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Consume the response and return the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Issues exactly one request per call.
///
/// Implementations never retry, wait, or look at retry state.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request described by `spec` with `verb`.
    async fn issue(&self, verb: HttpVerb, spec: &RequestSpec)
        -> Result<HttpResponse, RequestFailure>;
}

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn issue(
        &self,
        verb: HttpVerb,
        spec: &RequestSpec,
    ) -> Result<HttpResponse, RequestFailure> {
        debug!(verb = %verb, url = %spec.url(), "Making HTTP request");

        let options = spec.options();
        let mut request = self.client.request(verb.into(), spec.url());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = spec.body() {
            request = request.json(body);
        }

        let response = request.send().await.map_err(RequestFailure::from)?;
        check_response(response).await
    }
}

/// Read the response and turn non-2xx statuses into failures.
async fn check_response(response: Response) -> Result<HttpResponse, RequestFailure> {
    let status = response.status();
    let headers = response.headers().clone();

    if status.is_success() {
        let body = response.bytes().await.map_err(RequestFailure::from)?;
        return Ok(HttpResponse::new(status.as_u16(), headers, body));
    }

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            debug!(status = status.as_u16(), error = %e, "Failed to read error response body");
            Bytes::new()
        }
    };
    Err(RequestFailure::Status {
        status: status.as_u16(),
        message: failure_message(status.as_u16(), &body),
        body,
    })
}

/// Pick the most useful message from an error response body.
///
/// Prefers a JSON `message` field (string, or array of strings), then the
/// raw text, then the canonical reason phrase.
pub(crate) fn failure_message(status: u16, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        match value.get("message") {
            Some(serde_json::Value::String(msg)) => return msg.clone(),
            Some(serde_json::Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
                if !parts.is_empty() {
                    return parts.join(", ");
                }
            }
            _ => {}
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("HTTP error")
        .to_string()
}

/// Builder for a reqwest-backed [`RetryingExecutor`].
#[derive(Debug, Default)]
pub struct RetryClientBuilder {
    client: Option<Client>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl RetryClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client; other settings are ignored.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the executor.
    pub fn build(self) -> Result<RetryingExecutor<ReqwestTransport>, RequestFailure> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                if let Some(user_agent) = self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                builder.build().map_err(RequestFailure::from)?
            }
        };

        Ok(RetryingExecutor::new(ReqwestTransport::with_client(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFaultKind;
    use rstest::rstest;

    #[rstest]
    #[case(br#"{"message": "Pump 4 is locked"}"#.as_slice(), "Pump 4 is locked")]
    #[case(br#"{"message": ["price must be positive", "pump is required"]}"#.as_slice(), "price must be positive, pump is required")]
    #[case(br#"{"error": "nope"}"#.as_slice(), r#"{"error": "nope"}"#)]
    #[case(b"  upstream exploded \n".as_slice(), "upstream exploded")]
    #[case(b"".as_slice(), "Service Unavailable")]
    fn test_failure_message(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(failure_message(503, body), expected);
    }

    #[test]
    fn test_failure_message_unknown_status() {
        assert_eq!(failure_message(599, b""), "HTTP error");
    }

    #[test]
    fn test_response_accessors() {
        let response = HttpResponse::new(201, HeaderMap::new(), r#"{"id": 9}"#);
        assert_eq!(response.status(), 201);
        assert_eq!(response.text(), r#"{"id": 9}"#);

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 9);
    }

    #[test]
    fn test_builder() {
        let executor = RetryClientBuilder::new()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(2))
            .user_agent("gas-station-tests")
            .build();
        assert!(executor.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_failure() {
        let transport = ReqwestTransport::new();
        let result = transport
            .issue(HttpVerb::Get, &RequestSpec::new("not a url"))
            .await;

        match result {
            Err(RequestFailure::Transport { kind, .. }) => {
                assert_eq!(kind, TransportFaultKind::Request)
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }
}
