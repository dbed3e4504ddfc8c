//! Sliding window state

use super::types::RateLimitConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Timestamps of granted acquisitions, oldest first
#[derive(Debug, Default)]
pub(super) struct RateWindow {
    grants: VecDeque<Instant>,
    /// Provider-announced reset; no grants before this instant
    deferred_until: Option<Instant>,
}

impl RateWindow {
    /// Drop grants that have left the trailing window
    fn prune(&mut self, now: Instant, period: Duration) {
        while let Some(&oldest) = self.grants.front() {
            if now.saturating_duration_since(oldest) >= period {
                self.grants.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a grant at `now`, or return how long to wait before re-checking
    pub(super) fn try_grant(&mut self, now: Instant, config: &RateLimitConfig) -> Result<(), Duration> {
        if let Some(until) = self.deferred_until {
            if now < until {
                return Err(until - now);
            }
            self.deferred_until = None;
        }

        self.prune(now, config.period);

        if self.grants.len() < config.max_calls as usize {
            self.grants.push_back(now);
            return Ok(());
        }

        // Full window: wait exactly until the oldest grant expires
        let oldest = self.grants.front().copied().unwrap_or(now);
        Err(config
            .period
            .saturating_sub(now.saturating_duration_since(oldest)))
    }

    pub(super) fn remaining(&mut self, now: Instant, config: &RateLimitConfig) -> u32 {
        if self.deferred_until.is_some_and(|until| now < until) {
            return 0;
        }
        self.prune(now, config.period);
        config.max_calls.saturating_sub(self.grants.len() as u32)
    }

    pub(super) fn defer_until(&mut self, until: Instant) {
        if self.deferred_until.is_none_or(|current| until > current) {
            self.deferred_until = Some(until);
        }
    }
}
