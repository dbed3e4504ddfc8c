//! Shared client contract and the HTTP core every adapter builds on
//!
//! [`ApiClient`] is the capability contract. [`ClientCore`] owns the pooled
//! connection, the rate limiter and the retry policy, and turns HTTP
//! failures into the error taxonomy before the retry layer sees them.

mod api;
mod base;
mod capability;
mod http;

#[cfg(test)]
mod tests;

pub use api::ApiClient;
pub use base::ClientCore;
pub use capability::Capability;
pub use http::{classify_status, parse_rate_limit_reset, parse_retry_after};
