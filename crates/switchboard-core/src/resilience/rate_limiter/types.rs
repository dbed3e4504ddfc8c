//! Rate limiter configuration

use std::time::Duration;

/// Call ceiling for one client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum grants within any trailing `period`
    pub max_calls: u32,
    /// Length of the trailing window
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 60,
            period: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self { max_calls, period }
    }
}
