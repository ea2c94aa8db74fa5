//! Rate-limit values observed from the remote API.
//!
//! - [`RateSignal`]: an explicit "slow down" from a `429` response.
//! - [`QuotaHeaders`]: the `RateLimit-*` headers parsed from any response; the owning bucket
//!   feeds them into its quota.

use http::HeaderMap;
use std::fmt;
use std::time::Duration;

/// Total quota per window.
pub const HEADER_LIMIT: &str = "ratelimit-limit";
/// Quota left in the current window.
pub const HEADER_REMAINING: &str = "ratelimit-remaining";
/// Seconds until the window resets (fractional allowed).
pub const HEADER_RESET: &str = "ratelimit-reset";
/// Sent on every request so the reset header carries millisecond precision.
pub const HEADER_PRECISION: &str = "ratelimit-precision";

/// Explicit rate-limit rejection: the route (or the whole API) is exhausted for `retry_after`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSignal {
    retry_after: Duration,
    global: bool,
}

impl RateSignal {
    /// Build a signal from a retry-after in seconds. Negative or non-finite values are
    /// rejected.
    pub fn from_secs_f64(retry_after_secs: f64, global: bool) -> Option<Self> {
        if !retry_after_secs.is_finite() || retry_after_secs < 0.0 {
            return None;
        }
        let retry_after = Duration::try_from_secs_f64(retry_after_secs).ok()?;
        Some(Self { retry_after, global })
    }

    pub fn new(retry_after: Duration, global: bool) -> Self {
        Self { retry_after, global }
    }

    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    /// Whether the limit applies to every route rather than just the one that hit it.
    pub fn is_global(&self) -> bool {
        self.global
    }
}

impl fmt::Display for RateSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.global { "global" } else { "non-global" };
        write!(f, "RATELIMIT {}, retry after {:.3} s", scope, self.retry_after.as_secs_f64())
    }
}

/// `RateLimit-*` headers of a single response. Absent or malformed headers are `None`;
/// nothing here is ever guessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaHeaders {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub reset_after: Option<Duration>,
}

impl QuotaHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_str(headers, HEADER_LIMIT).and_then(parse_count),
            remaining: header_str(headers, HEADER_REMAINING).and_then(parse_count),
            reset_after: header_str(headers, HEADER_RESET).and_then(parse_reset),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset_after.is_none()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Integer count; decimals are truncated, negatives and garbage rejected.
pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.min(f64::from(u32::MAX)) as u32)
}

/// Seconds until reset. Zero means "no timer".
pub(crate) fn parse_reset(raw: &str) -> Option<Duration> {
    let secs = parse_seconds(raw)?;
    if secs == 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Finite, non-negative seconds.
pub(crate) fn parse_seconds(raw: &str) -> Option<f64> {
    let secs = raw.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(secs)
}
