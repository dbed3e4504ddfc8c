//! Sliding-window rate limiter

use super::types::RateLimitConfig;
use super::window::RateWindow;
use crate::clock::{SharedClock, system_clock};
use crate::error::{ClientError, ClientResult};
use crate::resilience::CallContext;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Rate limiter for one client instance.
///
/// The window lock is only held while inspecting and mutating the window,
/// never across a sleep, so concurrent callers queue on the clock rather than
/// on the mutex.
pub struct RateLimiter {
    name: String,
    config: RateLimitConfig,
    window: Mutex<RateWindow>,
    clock: SharedClock,
}

impl RateLimiter {
    /// Create a limiter on the tokio clock
    pub fn new(name: impl Into<String>, config: RateLimitConfig) -> Self {
        Self::with_clock(name, config, system_clock())
    }

    /// Create a limiter on an explicit clock
    pub fn with_clock(name: impl Into<String>, config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            name: name.into(),
            config,
            window: Mutex::new(RateWindow::default()),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a call slot is free, then record the grant.
    ///
    /// Returns how long the caller was suspended.
    pub async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = match self.window.lock().try_grant(self.clock.now(), &self.config) {
                Ok(()) => return waited,
                Err(wait) => wait,
            };
            debug!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "rate limit reached, waiting for window capacity"
            );
            self.clock.sleep(wait).await;
            waited += wait;
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up when the context is
    /// cancelled or the next wait would overrun its deadline.
    pub async fn acquire_with(&self, ctx: &CallContext) -> ClientResult<Duration> {
        let mut waited = Duration::ZERO;
        loop {
            if ctx.is_cancelled() {
                return Err(ClientError::cancelled(&self.name, 0));
            }

            let now = self.clock.now();
            let wait = match self.window.lock().try_grant(now, &self.config) {
                Ok(()) => {
                    if waited > Duration::ZERO {
                        debug!(
                            limiter = %self.name,
                            waited_ms = waited.as_millis() as u64,
                            "rate limiter slot granted after wait"
                        );
                    }
                    return Ok(waited);
                }
                Err(wait) => wait,
            };

            if ctx.would_overrun(now, wait) {
                warn!(
                    limiter = %self.name,
                    wait_ms = wait.as_millis() as u64,
                    "rate limiter wait would overrun the call deadline"
                );
                return Err(ClientError::deadline_exceeded(&self.name, 0, None));
            }

            if !ctx.sleep(self.clock.as_ref(), wait).await {
                return Err(ClientError::cancelled(&self.name, 0));
            }
            waited += wait;
        }
    }

    /// Record a grant only if a slot is free right now
    pub fn try_acquire(&self) -> bool {
        self.window
            .lock()
            .try_grant(self.clock.now(), &self.config)
            .is_ok()
    }

    /// Slots left in the current window
    pub fn available(&self) -> u32 {
        self.window.lock().remaining(self.clock.now(), &self.config)
    }

    /// Hold every grant until `until` (provider announced an exhausted quota)
    pub fn defer_until(&self, until: Instant) {
        debug!(limiter = %self.name, "deferring grants until provider reset");
        self.window.lock().defer_until(until);
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
