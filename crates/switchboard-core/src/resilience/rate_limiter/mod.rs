//! Rate limiter for provider API calls
//!
//! Implements a sliding-window call ceiling: at most `max_calls` grants within
//! any trailing `period`, per client instance.

mod limiter;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use limiter::RateLimiter;
pub use types::RateLimitConfig;
