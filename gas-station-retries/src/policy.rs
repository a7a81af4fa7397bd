//! Retry policy for a single logical operation.

use crate::error::RequestFailure;
use crate::transport::HttpResponse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Status assigned to failures that carry no HTTP response.
///
/// Listing it among the retryable codes makes transport faults
/// (refused connections, timeouts) retryable. They are terminal otherwise.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Degenerate policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// `max_retries` was negative.
    #[error("max_retries must not be negative (got {0})")]
    NegativeMaxRetries(i64),

    /// `attempt_count` was negative.
    #[error("attempt_count must not be negative (got {0})")]
    NegativeAttemptCount(i64),

    /// The delay was negative.
    #[error("delay must not be negative (got {0} ms)")]
    NegativeDelay(i64),

    /// A count does not fit the policy's integer range.
    #[error("{field} is too large (got {value})")]
    TooLarge {
        /// Offending field.
        field: &'static str,
        /// Supplied value.
        value: i64,
    },

    /// The starting attempt count is already past the budget.
    #[error("attempt_count {attempt_count} exceeds max_retries {max_retries}")]
    AttemptCountExceedsMax {
        /// Supplied attempt count.
        attempt_count: u32,
        /// Supplied budget.
        max_retries: u32,
    },

    /// A retryable code outside `100..=599` that is not the sentinel.
    #[error("invalid retryable status code {0}")]
    InvalidStatusCode(u16),
}

/// Per-attempt outcome of a request under a policy.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx response.
    Success(HttpResponse),
    /// Failure that may be retried after the policy's delay.
    RetryableFailure {
        /// Status the decision was made on.
        status: u16,
        /// The failure itself.
        failure: RequestFailure,
    },
    /// Failure that ends the chain.
    TerminalFailure(RequestFailure),
}

/// Immutable retry contract for one logical operation.
///
/// A policy is never mutated. Each retry replaces it with the value
/// returned by [`RetryPolicy::next_attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    retryable_status_codes: BTreeSet<u16>,
    attempt_count: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryPolicy {
    /// Create a policy starting at attempt 0.
    pub fn new(
        max_retries: u32,
        retryable_status_codes: impl IntoIterator<Item = u16>,
        delay: Duration,
    ) -> Result<Self, PolicyError> {
        Self::builder()
            .max_retries(max_retries)
            .retry_on(retryable_status_codes)
            .delay(delay)
            .build()
    }

    /// Create a builder.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retryable_status_codes: BTreeSet::new(),
            attempt_count: 0,
            delay: Duration::ZERO,
        }
    }

    /// Build from unchecked signed inputs, as received from configuration.
    pub fn from_raw(
        max_retries: i64,
        retryable_status_codes: impl IntoIterator<Item = u16>,
        attempt_count: i64,
        delay_ms: i64,
    ) -> Result<Self, PolicyError> {
        if max_retries < 0 {
            return Err(PolicyError::NegativeMaxRetries(max_retries));
        }
        if attempt_count < 0 {
            return Err(PolicyError::NegativeAttemptCount(attempt_count));
        }
        if delay_ms < 0 {
            return Err(PolicyError::NegativeDelay(delay_ms));
        }

        let max = u32::try_from(max_retries).map_err(|_| PolicyError::TooLarge {
            field: "max_retries",
            value: max_retries,
        })?;
        let attempt = u32::try_from(attempt_count).map_err(|_| PolicyError::TooLarge {
            field: "attempt_count",
            value: attempt_count,
        })?;

        Self::builder()
            .max_retries(max)
            .retry_on(retryable_status_codes)
            .attempt_count(attempt)
            .delay(Duration::from_millis(delay_ms.unsigned_abs()))
            .build()
    }

    /// Upper bound on retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Retries already taken in this chain.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Fixed wait before each retry.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Status codes eligible for retry.
    pub fn retryable_status_codes(&self) -> &BTreeSet<u16> {
        &self.retryable_status_codes
    }

    /// Check if `status` is in the retryable set.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Check if another retry may be taken.
    pub fn has_budget(&self) -> bool {
        self.attempt_count < self.max_retries
    }

    /// The policy for the next attempt, with the counter advanced by one.
    #[must_use]
    pub fn next_attempt(self) -> Self {
        Self {
            attempt_count: self.attempt_count.saturating_add(1),
            ..self
        }
    }

    /// Classify the result of one attempt.
    ///
    /// Failures without a status are matched against [`NO_RESPONSE_STATUS`].
    pub fn classify(&self, result: Result<HttpResponse, RequestFailure>) -> Outcome {
        match result {
            Ok(response) => Outcome::Success(response),
            Err(failure) => {
                let status = failure.status_code().unwrap_or(NO_RESPONSE_STATUS);
                if self.has_budget() && self.is_retryable_status(status) {
                    Outcome::RetryableFailure { status, failure }
                } else {
                    Outcome::TerminalFailure(failure)
                }
            }
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_retries: u32,
    retryable_status_codes: BTreeSet<u16>,
    attempt_count: u32,
    delay: Duration,
}

impl RetryPolicyBuilder {
    /// Set max retries.
    #[must_use]
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Add retryable status codes.
    #[must_use]
    pub fn retry_on(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes.extend(codes);
        self
    }

    /// Also retry failures that produced no response.
    #[must_use]
    pub fn retry_on_no_response(mut self) -> Self {
        self.retryable_status_codes.insert(NO_RESPONSE_STATUS);
        self
    }

    /// Set the starting attempt count.
    #[must_use]
    pub fn attempt_count(mut self, n: u32) -> Self {
        self.attempt_count = n;
        self
    }

    /// Set the fixed delay.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the fixed delay in milliseconds.
    #[must_use]
    pub fn delay_ms(self, millis: u64) -> Self {
        self.delay(Duration::from_millis(millis))
    }

    /// Validate and build the policy.
    pub fn build(self) -> Result<RetryPolicy, PolicyError> {
        if self.attempt_count > self.max_retries {
            return Err(PolicyError::AttemptCountExceedsMax {
                attempt_count: self.attempt_count,
                max_retries: self.max_retries,
            });
        }

        if let Some(&code) = self
            .retryable_status_codes
            .iter()
            .find(|&&c| c != NO_RESPONSE_STATUS && !(100..=599).contains(&c))
        {
            return Err(PolicyError::InvalidStatusCode(code));
        }

        Ok(RetryPolicy {
            max_retries: self.max_retries,
            retryable_status_codes: self.retryable_status_codes,
            attempt_count: self.attempt_count,
            delay: self.delay,
        })
    }
}

/// Serializable policy settings, validated on conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicyConfig {
    /// Upper bound on retries.
    pub max_retries: i64,
    /// Status codes eligible for retry.
    #[serde(default)]
    pub retryable_status_codes: Vec<u16>,
    /// Starting attempt count.
    #[serde(default)]
    pub attempt_count: i64,
    /// Fixed delay in milliseconds.
    #[serde(default)]
    pub delay_ms: i64,
}

impl TryFrom<RetryPolicyConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: RetryPolicyConfig) -> Result<Self, Self::Error> {
        RetryPolicy::from_raw(
            config.max_retries,
            config.retryable_status_codes,
            config.attempt_count,
            config.delay_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFaultKind;
    use reqwest::header::HeaderMap;
    use rstest::rstest;

    fn ok_response() -> HttpResponse {
        HttpResponse::new(200, HeaderMap::new(), "ok")
    }

    fn policy(max_retries: u32, codes: &[u16]) -> RetryPolicy {
        RetryPolicy::new(max_retries, codes.iter().copied(), Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_no_retry_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 0);
        assert_eq!(policy.attempt_count(), 0);
        assert!(!policy.has_budget());
        assert!(policy.retryable_status_codes().is_empty());
    }

    #[test]
    fn test_builder() {
        let policy = RetryPolicy::builder()
            .max_retries(3)
            .retry_on([502, 503])
            .retry_on([503, 504])
            .delay_ms(250)
            .build()
            .unwrap();

        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.delay(), Duration::from_millis(250));
        assert_eq!(
            policy.retryable_status_codes().iter().copied().collect::<Vec<_>>(),
            vec![502, 503, 504]
        );
    }

    #[test]
    fn test_next_attempt_is_monotonic() {
        let mut policy = policy(3, &[503]);
        let mut seen = vec![policy.attempt_count()];
        while policy.has_budget() {
            policy = policy.next_attempt();
            seen.push(policy.attempt_count());
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_next_attempt_keeps_other_fields() {
        let original = policy(2, &[503]);
        let next = original.clone().next_attempt();

        assert_eq!(next.max_retries(), original.max_retries());
        assert_eq!(next.delay(), original.delay());
        assert_eq!(next.retryable_status_codes(), original.retryable_status_codes());
        assert_eq!(original.attempt_count(), 0);
    }

    #[rstest]
    #[case(-1, 0, 0, PolicyError::NegativeMaxRetries(-1))]
    #[case(1, -2, 0, PolicyError::NegativeAttemptCount(-2))]
    #[case(1, 0, -5, PolicyError::NegativeDelay(-5))]
    #[case(1, 2, 0, PolicyError::AttemptCountExceedsMax { attempt_count: 2, max_retries: 1 })]
    #[case(
        i64::from(u32::MAX) + 1,
        0,
        0,
        PolicyError::TooLarge { field: "max_retries", value: i64::from(u32::MAX) + 1 }
    )]
    fn test_from_raw_rejects(
        #[case] max_retries: i64,
        #[case] attempt_count: i64,
        #[case] delay_ms: i64,
        #[case] expected: PolicyError,
    ) {
        let result = RetryPolicy::from_raw(max_retries, [503], attempt_count, delay_ms);
        assert_eq!(result.unwrap_err(), expected);
    }

    #[test]
    fn test_from_raw_accepts() {
        let policy = RetryPolicy::from_raw(2, [503], 1, 100).unwrap();
        assert_eq!(policy.max_retries(), 2);
        assert_eq!(policy.attempt_count(), 1);
        assert_eq!(policy.delay(), Duration::from_millis(100));
    }

    #[rstest]
    #[case(99)]
    #[case(600)]
    fn test_invalid_status_code(#[case] code: u16) {
        let result = RetryPolicy::builder().max_retries(1).retry_on([code]).build();
        assert_eq!(result.unwrap_err(), PolicyError::InvalidStatusCode(code));
    }

    #[test]
    fn test_sentinel_is_allowed() {
        let policy = RetryPolicy::builder()
            .max_retries(1)
            .retry_on_no_response()
            .build()
            .unwrap();
        assert!(policy.is_retryable_status(NO_RESPONSE_STATUS));
    }

    #[test]
    fn test_classify_success() {
        let outcome = policy(2, &[503]).classify(Ok(ok_response()));
        assert!(matches!(outcome, Outcome::Success(r) if r.status() == 200));
    }

    #[test]
    fn test_classify_retryable() {
        let outcome = policy(2, &[503]).classify(Err(RequestFailure::status(503, "busy")));
        assert!(matches!(outcome, Outcome::RetryableFailure { status: 503, .. }));
    }

    #[test]
    fn test_classify_status_not_in_set() {
        let outcome = policy(2, &[503]).classify(Err(RequestFailure::status(500, "boom")));
        assert!(matches!(outcome, Outcome::TerminalFailure(_)));
    }

    #[test]
    fn test_classify_budget_exhausted() {
        let exhausted = policy(1, &[503]).next_attempt();
        let outcome = exhausted.classify(Err(RequestFailure::status(503, "busy")));
        assert!(matches!(outcome, Outcome::TerminalFailure(_)));
    }

    #[test]
    fn test_classify_zero_budget() {
        let outcome = policy(0, &[503]).classify(Err(RequestFailure::status(503, "busy")));
        assert!(matches!(outcome, Outcome::TerminalFailure(_)));
    }

    #[test]
    fn test_classify_missing_status_is_terminal() {
        let failure = RequestFailure::transport(TransportFaultKind::Connect, "refused");
        let outcome = policy(3, &[500, 502, 503, 504]).classify(Err(failure));
        assert!(matches!(outcome, Outcome::TerminalFailure(_)));
    }

    #[test]
    fn test_classify_missing_status_with_sentinel() {
        let policy = RetryPolicy::builder()
            .max_retries(3)
            .retry_on_no_response()
            .build()
            .unwrap();
        let failure = RequestFailure::transport(TransportFaultKind::Timeout, "slow");
        let outcome = policy.classify(Err(failure));
        assert!(matches!(
            outcome,
            Outcome::RetryableFailure { status: NO_RESPONSE_STATUS, .. }
        ));
    }

    #[test]
    fn test_config_deserialize() {
        let config: RetryPolicyConfig = serde_json::from_str(
            r#"{"maxRetries": 2, "retryableStatusCodes": [503], "delayMs": 500}"#,
        )
        .unwrap();

        let policy = RetryPolicy::try_from(config).unwrap();
        assert_eq!(policy.max_retries(), 2);
        assert_eq!(policy.attempt_count(), 0);
        assert!(policy.is_retryable_status(503));
        assert_eq!(policy.delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_negative_delay() {
        let config = RetryPolicyConfig {
            max_retries: 1,
            delay_ms: -1,
            ..Default::default()
        };
        assert_eq!(
            RetryPolicy::try_from(config).unwrap_err(),
            PolicyError::NegativeDelay(-1)
        );
    }
}
