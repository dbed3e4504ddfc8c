//! Bounded retry with backoff, deadline and cancellation
//!
//! Attempt numbering is 0-indexed: `max_retries = R` allows attempts
//! `0..=R`, so R + 1 calls in total.

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::context::CallContext;
use super::{ErrorClass, classify_error};
use crate::clock::{SharedClock, system_clock};
use crate::error::{ClientError, ClientResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Decides whether a failure is worth another attempt
pub type Classifier = fn(&ClientError) -> ErrorClass;

/// Retry budget and backoff timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Create a config that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.backoff.base_delay = delay;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    /// Set the jitter ratio
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.backoff.jitter_ratio = ratio;
        self
    }
}

/// Retry policy for one provider
pub struct RetryPolicy {
    provider: String,
    max_retries: u32,
    backoff: ExponentialBackoff,
    classifier: Classifier,
    clock: SharedClock,
}

impl RetryPolicy {
    pub fn new(provider: impl Into<String>, config: RetryConfig) -> Self {
        Self::with_clock(provider, config, system_clock())
    }

    pub fn with_clock(provider: impl Into<String>, config: RetryConfig, clock: SharedClock) -> Self {
        Self {
            provider: provider.into(),
            max_retries: config.max_retries,
            backoff: ExponentialBackoff::new(config.backoff),
            classifier: classify_error,
            clock,
        }
    }

    /// Replace the default [`classify_error`] classifier
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }

    /// Delay before retrying after `attempt` failed, honoring a server hint.
    ///
    /// A `Retry-After` hint can lengthen the computed delay but never
    /// shorten it, and the cap still applies.
    pub fn delay_for(&self, attempt: u32, error: &ClientError) -> Duration {
        let delay = self.backoff.delay_for_attempt(attempt);
        match error.retry_after() {
            Some(hint) => delay.max(hint).min(self.backoff.max_delay()),
            None => delay,
        }
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// retries, overruns the context deadline or is cancelled.
    ///
    /// The operation receives the 0-indexed attempt number.
    pub async fn execute<T, F, Fut>(&self, ctx: &CallContext, mut operation: F) -> ClientResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt: u32 = 0;
        let mut last_error: Option<ClientError> = None;

        loop {
            if ctx.is_cancelled() {
                return Err(ClientError::cancelled(&self.provider, attempt));
            }
            if ctx.deadline_passed(self.clock.now()) {
                return Err(ClientError::deadline_exceeded(
                    &self.provider,
                    attempt,
                    last_error,
                ));
            }

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(provider = %self.provider, attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            // The rate limiter gave up before the request was sent, so this
            // attempt does not count.
            match error {
                ClientError::Cancelled { .. } => {
                    return Err(ClientError::cancelled(&self.provider, attempt));
                }
                ClientError::DeadlineExceeded { .. } => {
                    return Err(ClientError::deadline_exceeded(
                        &self.provider,
                        attempt,
                        last_error,
                    ));
                }
                _ => {}
            }

            let attempts_made = attempt + 1;

            if (self.classifier)(&error) == ErrorClass::Permanent {
                debug!(
                    provider = %self.provider,
                    attempt,
                    kind = %error.kind(),
                    "permanent failure, not retrying"
                );
                return Err(error);
            }

            if attempt >= self.max_retries {
                error!(
                    provider = %self.provider,
                    attempts = attempts_made,
                    error = %error,
                    "retries exhausted"
                );
                return Err(ClientError::retry_exhausted(
                    &self.provider,
                    attempts_made,
                    error,
                ));
            }

            let delay = self.delay_for(attempt, &error);
            if ctx.would_overrun(self.clock.now(), delay) {
                warn!(
                    provider = %self.provider,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backoff would overrun the call deadline"
                );
                return Err(ClientError::deadline_exceeded(
                    &self.provider,
                    attempts_made,
                    Some(error),
                ));
            }

            warn!(
                provider = %self.provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                status = ?error.status(),
                error = %error,
                "transient failure, retrying after backoff"
            );

            if !ctx.sleep(self.clock.as_ref(), delay).await {
                return Err(ClientError::cancelled(&self.provider, attempts_made));
            }

            last_error = Some(error);
            attempt += 1;
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("provider", &self.provider)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
