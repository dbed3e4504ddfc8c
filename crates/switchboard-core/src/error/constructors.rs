//! Constructor methods for ClientError

use super::types::ClientError;
use crate::client::Capability;
use std::time::Duration;

impl ClientError {
    /// Create a new configuration error
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a transient network error without an HTTP status (timeouts, resets)
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            provider: provider.into(),
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    /// Create a transient error from a 429 or 5xx response
    pub fn transient_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::TransientNetwork {
            provider: provider.into(),
            message: message.into(),
            status: Some(status),
            retry_after,
        }
    }

    /// Create a permanent request error from a non-retryable 4xx response
    pub fn permanent(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::PermanentRequest {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a response parsing/validation error
    pub fn response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a capability mismatch error
    pub fn capability_mismatch(provider: impl Into<String>, capability: Capability) -> Self {
        Self::CapabilityMismatch {
            provider: provider.into(),
            capability,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap the last transient failure after the retry budget is spent
    pub fn retry_exhausted(provider: impl Into<String>, attempts: u32, last: ClientError) -> Self {
        Self::RetryExhausted {
            provider: provider.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Create a deadline error
    pub fn deadline_exceeded(
        provider: impl Into<String>,
        attempts: u32,
        last: Option<ClientError>,
    ) -> Self {
        Self::DeadlineExceeded {
            provider: provider.into(),
            attempts,
            last: last.map(Box::new),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(provider: impl Into<String>, attempts: u32) -> Self {
        Self::Cancelled {
            provider: provider.into(),
            attempts,
        }
    }

    /// Create a closed-client error
    pub fn closed(provider: impl Into<String>) -> Self {
        Self::Closed {
            provider: provider.into(),
        }
    }
}
