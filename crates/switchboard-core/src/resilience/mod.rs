//! Resilience primitives shared by every provider client
//!
//! - Error classification (transient vs permanent)
//! - Sliding-window rate limiting
//! - Capped exponential backoff with jitter
//! - Bounded retry with deadline and cancellation support

pub mod backoff;
pub mod context;
pub mod rate_limiter;
pub mod retry;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use context::CallContext;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{Classifier, RetryConfig, RetryPolicy};

use crate::error::{ClientError, ErrorKind};

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// May succeed if the same request is sent again
    Transient,
    /// Will fail the same way on every retry
    Permanent,
}

/// Classify a normalized error code.
///
/// Only transport-shaped failures (timeouts, connection errors, 429, 5xx) are
/// transient. Content-shaped failures such as schema violations are permanent.
pub const fn classify_kind(kind: ErrorKind) -> ErrorClass {
    match kind {
        ErrorKind::TransientNetwork => ErrorClass::Transient,
        ErrorKind::Configuration
        | ErrorKind::PermanentRequest
        | ErrorKind::ProviderResponse
        | ErrorKind::CapabilityMismatch
        | ErrorKind::RetryExhausted
        | ErrorKind::InvalidRequest
        | ErrorKind::DeadlineExceeded
        | ErrorKind::Cancelled
        | ErrorKind::Closed => ErrorClass::Permanent,
    }
}

/// Default classifier used by [`RetryPolicy`]
pub fn classify_error(error: &ClientError) -> ErrorClass {
    classify_kind(error.kind())
}
