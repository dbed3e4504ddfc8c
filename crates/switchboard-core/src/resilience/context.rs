//! Per-call deadline and cancellation

use crate::clock::Clock;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Caller-supplied limits for one logical request.
///
/// The deadline is measured against the client's [`Clock`]. Cancelling the
/// token does not interrupt I/O already in flight, but stops further retries
/// and further rate-limiter waits.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancellationToken>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the call once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the call when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    pub fn deadline_passed(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Whether waiting `wait` from `now` would overrun the deadline
    pub fn would_overrun(&self, now: Instant, wait: Duration) -> bool {
        self.deadline
            .is_some_and(|d| now.checked_add(wait).is_none_or(|end| end >= d))
    }

    /// Sleep on `clock`, returning `false` if cancelled before the sleep ended
    pub(crate) async fn sleep(&self, clock: &dyn Clock, duration: Duration) -> bool {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => false,
                    _ = clock.sleep(duration) => true,
                }
            }
            None => {
                clock.sleep(duration).await;
                true
            }
        }
    }
}
