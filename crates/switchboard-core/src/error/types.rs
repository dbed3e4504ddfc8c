//! Core error types

use crate::client::Capability;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for client layer operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Normalized error code.
///
/// Retry classification is a pure function over this code
/// (see [`crate::resilience::classify_error`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    TransientNetwork,
    PermanentRequest,
    ProviderResponse,
    CapabilityMismatch,
    RetryExhausted,
    InvalidRequest,
    DeadlineExceeded,
    Cancelled,
    Closed,
}

impl ErrorKind {
    /// Stable string code for logs and programmatic matching
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::TransientNetwork => "transient_network",
            Self::PermanentRequest => "permanent_request",
            Self::ProviderResponse => "provider_response",
            Self::CapabilityMismatch => "capability_mismatch",
            Self::RetryExhausted => "retry_exhausted",
            Self::InvalidRequest => "invalid_request",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Main error type for the client layer
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Missing/invalid credential or malformed provider configuration.
    /// Raised at construction time, never retried.
    #[error("Configuration error for '{provider}': {message}")]
    Configuration { provider: String, message: String },

    /// Timeout, connection failure, HTTP 429 or HTTP 5xx
    #[error("Transient network error from '{provider}': {message}")]
    TransientNetwork {
        provider: String,
        message: String,
        status: Option<u16>,
        /// Delay hint from a `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// Any other HTTP 4xx (bad request, auth failure, not found)
    #[error("Request rejected by '{provider}' (status {status}): {message}")]
    PermanentRequest {
        provider: String,
        status: u16,
        message: String,
    },

    /// Payload failed to parse or failed schema validation
    #[error("Invalid response from '{provider}': {message}")]
    ProviderResponse { provider: String, message: String },

    /// Operation not supported by the adapter, detected before any network call
    #[error("Provider '{provider}' does not support {capability}")]
    CapabilityMismatch {
        provider: String,
        capability: Capability,
    },

    /// All retries spent on transient failures
    #[error("Request to '{provider}' failed after {attempts} attempts: {last}")]
    RetryExhausted {
        provider: String,
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },

    /// The request itself is unusable (empty messages, bad schema, no deployment)
    #[error("Invalid request for '{provider}': {message}")]
    InvalidRequest { provider: String, message: String },

    /// The caller-supplied deadline expired before the call could complete
    #[error("Deadline exceeded for '{provider}' after {attempts} attempts")]
    DeadlineExceeded {
        provider: String,
        attempts: u32,
        last: Option<Box<ClientError>>,
    },

    /// The caller cancelled the call
    #[error("Request to '{provider}' was cancelled after {attempts} attempts")]
    Cancelled { provider: String, attempts: u32 },

    /// The client has been closed and released its connection pool
    #[error("Client for '{provider}' is closed")]
    Closed { provider: String },
}

impl ClientError {
    /// Normalized code for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            Self::PermanentRequest { .. } => ErrorKind::PermanentRequest,
            Self::ProviderResponse { .. } => ErrorKind::ProviderResponse,
            Self::CapabilityMismatch { .. } => ErrorKind::CapabilityMismatch,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Closed { .. } => ErrorKind::Closed,
        }
    }

    /// Provider the error originated from
    pub fn provider(&self) -> &str {
        match self {
            Self::Configuration { provider, .. }
            | Self::TransientNetwork { provider, .. }
            | Self::PermanentRequest { provider, .. }
            | Self::ProviderResponse { provider, .. }
            | Self::CapabilityMismatch { provider, .. }
            | Self::RetryExhausted { provider, .. }
            | Self::InvalidRequest { provider, .. }
            | Self::DeadlineExceeded { provider, .. }
            | Self::Cancelled { provider, .. }
            | Self::Closed { provider } => provider,
        }
    }

    /// HTTP status carried by the error, looking through retry wrappers
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransientNetwork { status, .. } => *status,
            Self::PermanentRequest { status, .. } => Some(*status),
            Self::RetryExhausted { last, .. } => last.status(),
            Self::DeadlineExceeded { last, .. } => last.as_ref().and_then(|e| e.status()),
            _ => None,
        }
    }

    /// Number of attempts recorded by a terminal retry error
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetryExhausted { attempts, .. }
            | Self::DeadlineExceeded { attempts, .. }
            | Self::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Whether this error is timeout-shaped from the caller's point of view
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::DeadlineExceeded { .. } => true,
            Self::TransientNetwork {
                status: None,
                message,
                ..
            } => message.contains("timed out"),
            Self::RetryExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// Server-provided retry delay hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientNetwork { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
