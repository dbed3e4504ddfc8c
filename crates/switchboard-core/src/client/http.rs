//! HTTP status and header interpretation

use crate::error::{ClientError, sanitize_provider_error_text};
use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Values above this are absolute Unix timestamps rather than delays
const EPOCH_THRESHOLD_SECS: f64 = 1_000_000_000.0;

/// Longest delay any header may announce; larger values are clamped
pub const MAX_HEADER_DELAY: Duration = Duration::from_secs(3600);

/// Map a non-success HTTP status to the error taxonomy.
///
/// 429 and 5xx are transient; every other status is permanent. The body is
/// sanitized before it enters the message.
pub fn classify_status(
    provider: &str,
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ClientError {
    let message = sanitize_provider_error_text(body);
    match status {
        429 | 500..=599 => ClientError::transient_status(provider, status, message, retry_after),
        _ => ClientError::permanent(provider, status, message),
    }
}

/// `Retry-After` in delta-seconds (fractional values accepted)
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    parse_seconds(raw)
}

/// Delay until the provider's quota resets, when the response says the
/// quota is exhausted (`x-ratelimit-remaining: 0`).
///
/// `x-ratelimit-reset` may be a Unix timestamp, a number of seconds, or a
/// seconds value with an `s` suffix.
pub fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<Duration> {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .or_else(|| headers.get("x-ratelimit-remaining-requests"))?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    if remaining > 0 {
        return None;
    }

    let raw = headers
        .get("x-ratelimit-reset")
        .or_else(|| headers.get("x-ratelimit-reset-requests"))?
        .to_str()
        .ok()?
        .trim();
    let value = raw.trim_end_matches('s').parse::<f64>().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    if value >= EPOCH_THRESHOLD_SECS {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs_f64();
        let delta = value - now;
        (delta > 0.0).then(|| clamped_secs(delta))
    } else {
        Some(clamped_secs(value))
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    let value = raw.trim().parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then(|| clamped_secs(value))
}

/// Non-negative finite seconds, capped at [`MAX_HEADER_DELAY`]
fn clamped_secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .map(|d| d.min(MAX_HEADER_DELAY))
        .unwrap_or(MAX_HEADER_DELAY)
}
