//! # gas-station-retries
//!
//! Outbound HTTP calls with bounded, fixed-delay retries.
//!
//! ## Core Concepts
//!
//! - **[`RequestSpec`]**: URL, optional JSON body and options of one call
//! - **[`RetryPolicy`]**: how many retries, on which statuses, how long to wait
//! - **[`HttpTransport`]**: issues exactly one request ([`ReqwestTransport`])
//! - **[`RetryingExecutor`]**: drives the transport under a policy
//! - **[`RetriesExceeded`]**: the single error a failed chain produces
//!
//! A chain makes at most `max_retries + 1` requests. A failure is retried
//! only if its status is in the policy's retryable set and budget remains.
//! Failures without a response are matched against [`NO_RESPONSE_STATUS`]
//! and are terminal unless the policy lists it.
//!
//! ## Example
//!
//! ```ignore
//! use gas_station_retries::{RequestSpec, RetryClientBuilder, RetryPolicy};
//! use std::time::Duration;
//!
//! let executor = RetryClientBuilder::new()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(2)
//!     .retry_on([502, 503])
//!     .delay_ms(500)
//!     .build()?;
//!
//! let spec = RequestSpec::new("https://pix.example.com/transfers")
//!     .with_json(&transfer)?
//!     .with_header("X-Idempotency-Key", key);
//!
//! let response = executor.post_with_retries(&spec, policy).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod delay;
pub mod error;
pub mod executor;
pub mod policy;
pub mod request;
pub mod transport;

// Re-exports
pub use delay::{delay, delay_ms};
pub use error::{ErrorKind, RequestFailure, RetriesExceeded, TransportFaultKind};
pub use executor::RetryingExecutor;
pub use policy::{
    Outcome, PolicyError, RetryPolicy, RetryPolicyBuilder, RetryPolicyConfig, NO_RESPONSE_STATUS,
};
pub use request::{HttpVerb, RequestOptions, RequestSpec};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, RetryClientBuilder};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        HttpResponse, HttpVerb, RequestOptions, RequestSpec, RetriesExceeded, RetryPolicy,
        RetryingExecutor,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let policy = RetryPolicy::new(5, [503], Duration::from_millis(1)).unwrap();
        assert_eq!(policy.max_retries(), 5);

        let spec = RequestSpec::new("http://localhost");
        assert_eq!(spec.url(), "http://localhost");
    }

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 0);
        assert_eq!(policy.delay(), Duration::ZERO);
    }
}
