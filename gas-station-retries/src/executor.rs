//! Retrying request executor.

use crate::delay::delay;
use crate::error::{RequestFailure, RetriesExceeded};
use crate::policy::{Outcome, RetryPolicy};
use crate::request::{HttpVerb, RequestSpec};
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use tracing::{debug, warn};

/// Runs requests through an [`HttpTransport`], retrying per [`RetryPolicy`].
///
/// Attempts of one chain are strictly sequential and the delay between
/// them is fixed. There is no built-in deadline; wrap the call in
/// `tokio::time::timeout` to bound a whole chain.
///
/// # Example
///
/// ```ignore
/// use gas_station_retries::{RequestSpec, RetryPolicy, RetryingExecutor};
/// use std::time::Duration;
///
/// let executor = RetryingExecutor::default();
/// let policy = RetryPolicy::new(2, [503], Duration::from_millis(500))?;
/// let spec = RequestSpec::new("https://payments.local/charges")
///     .with_json(&charge)?;
///
/// let response = executor.post_with_retries(&spec, policy).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RetryingExecutor<T = ReqwestTransport> {
    transport: T,
}

impl Default for RetryingExecutor<ReqwestTransport> {
    fn default() -> Self {
        Self::new(ReqwestTransport::new())
    }
}

impl<T: HttpTransport> RetryingExecutor<T> {
    /// Create an executor over `transport`.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Single GET request, no retries.
    pub async fn get(&self, spec: &RequestSpec) -> Result<HttpResponse, RequestFailure> {
        self.transport.issue(HttpVerb::Get, spec).await
    }

    /// Single POST request, no retries.
    pub async fn post(&self, spec: &RequestSpec) -> Result<HttpResponse, RequestFailure> {
        self.transport.issue(HttpVerb::Post, spec).await
    }

    /// Single PUT request, no retries.
    pub async fn put(&self, spec: &RequestSpec) -> Result<HttpResponse, RequestFailure> {
        self.transport.issue(HttpVerb::Put, spec).await
    }

    /// GET with retries.
    pub async fn get_with_retries(
        &self,
        spec: &RequestSpec,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, RetriesExceeded> {
        self.execute_with_retry(HttpVerb::Get, spec, policy).await
    }

    /// POST with retries.
    pub async fn post_with_retries(
        &self,
        spec: &RequestSpec,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, RetriesExceeded> {
        self.execute_with_retry(HttpVerb::Post, spec, policy).await
    }

    /// PUT with retries.
    pub async fn put_with_retries(
        &self,
        spec: &RequestSpec,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, RetriesExceeded> {
        self.execute_with_retry(HttpVerb::Put, spec, policy).await
    }

    /// Issue `spec` until it succeeds or the policy declares the failure terminal.
    ///
    /// At most `max_retries - attempt_count + 1` requests are sent. Only the
    /// last failure is reported.
    pub async fn execute_with_retry(
        &self,
        verb: HttpVerb,
        spec: &RequestSpec,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, RetriesExceeded> {
        let mut policy = policy;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);

            debug!(
                verb = %verb,
                url = %spec.url(),
                attempt = policy.attempt_count(),
                max_retries = policy.max_retries(),
                "Executing request attempt"
            );

            let result = self.transport.issue(verb, spec).await;

            match policy.classify(result) {
                Outcome::Success(response) => return Ok(response),
                Outcome::RetryableFailure { status, failure } => {
                    debug!(
                        attempt = policy.attempt_count(),
                        status,
                        delay_ms = u64::try_from(policy.delay().as_millis()).unwrap_or(u64::MAX),
                        error = %failure,
                        "Waiting before retry"
                    );
                    delay(policy.delay()).await;
                    policy = policy.next_attempt();
                }
                Outcome::TerminalFailure(failure) => {
                    warn!(
                        verb = %verb,
                        url = %spec.url(),
                        attempt = policy.attempt_count(),
                        attempts,
                        status = ?failure.status_code(),
                        error = %failure,
                        "Retry exhausted or error not retryable"
                    );
                    return Err(RetriesExceeded::from_failure(&failure, attempts));
                }
            }
        }
    }
}
