//! Capped exponential backoff with uniform jitter

use rand::Rng;
use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry (attempt 0 failed)
    pub base_delay: Duration,
    /// Upper bound for any single delay, jitter included
    pub max_delay: Duration,
    /// Fraction of the exponential delay added as uniform jitter.
    /// Clamped to `0.0..=1.0`, which keeps the sequence non-decreasing.
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter_ratio: 0.2,
        }
    }
}

impl BackoffConfig {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            ..Default::default()
        }
    }

    /// Set the jitter ratio
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Disable jitter, making delays fully deterministic
    pub fn without_jitter(mut self) -> Self {
        self.jitter_ratio = 0.0;
        self
    }
}

/// Exponential backoff: `base_delay * 2^attempt`, plus jitter, capped
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        let jitter_ratio = if config.jitter_ratio.is_finite() {
            config.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            config: BackoffConfig {
                jitter_ratio,
                max_delay: config.max_delay.max(config.base_delay),
                ..config
            },
        }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    pub fn max_delay(&self) -> Duration {
        self.config.max_delay
    }

    /// Delay without jitter for the given failed attempt (0-indexed)
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        self.scaled(attempt, 0.0)
    }

    /// Delay with jitter for the given failed attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let sample = if self.config.jitter_ratio > 0.0 {
            rand::thread_rng().gen_range(0.0..=1.0)
        } else {
            0.0
        };
        self.scaled(attempt, sample)
    }

    /// `base * 2^attempt * (1 + sample * ratio)`, capped at `max_delay`.
    ///
    /// With `ratio <= 1` the jittered delay of attempt `n` never exceeds the
    /// unjittered delay of attempt `n + 1`.
    fn scaled(&self, attempt: u32, sample: f64) -> Duration {
        let exponential = self.config.base_delay.as_secs_f64() * 2f64.powi(attempt.min(1_000) as i32);
        let jittered = exponential * (1.0 + sample * self.config.jitter_ratio);
        let max_delay = self.config.max_delay;
        let capped = jittered.min(max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).map_or(max_delay, |d| d.min(max_delay))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
