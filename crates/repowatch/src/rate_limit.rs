//! Rate limit bookkeeping and proactive request pacing.

use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpHeaders, header_get};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limit information reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Extract rate limit info from GitHub's `x-ratelimit-*` response headers.
pub fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitInfo> {
    let limit = header_get(headers, "x-ratelimit-limit")?
        .parse::<usize>()
        .ok()?;
    let remaining = header_get(headers, "x-ratelimit-remaining")?
        .parse::<usize>()
        .ok()?;
    let reset_epoch = header_get(headers, "x-ratelimit-reset")?
        .parse::<i64>()
        .ok()?;
    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at: DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now),
    })
}

/// A standalone API rate limiter using the governor crate.
///
/// # Example
///
/// ```ignore
/// use repowatch::rate_limit::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// Zero is treated as one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// Format a duration in a human-readable way.
///
/// Negative durations render as `0s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

/// Time left until `reset_at`, formatted with [`format_duration`].
pub fn time_until(reset_at: DateTime<Utc>) -> String {
    format_duration(reset_at.signed_duration_since(Utc::now()))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration as StdDuration, Instant};

    use super::*;

    fn to_headers(pairs: Vec<(&str, &str)>) -> HttpHeaders {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_rate_limit_headers_success() {
        let headers = to_headers(vec![
            ("X-RateLimit-Limit", "60"),
            ("X-RateLimit-Remaining", "0"),
            ("X-RateLimit-Reset", "1706400000"),
        ]);

        let info = parse_rate_limit_headers(&headers).expect("headers should parse");
        assert_eq!(info.limit, 60);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.reset_at.timestamp(), 1_706_400_000);
        assert!(info.is_exhausted());
    }

    #[test]
    fn parse_rate_limit_headers_missing_or_invalid() {
        assert!(parse_rate_limit_headers(&Vec::new()).is_none());

        let headers = to_headers(vec![
            ("x-ratelimit-limit", "60"),
            ("x-ratelimit-remaining", "many"),
            ("x-ratelimit-reset", "1706400000"),
        ]);
        assert!(parse_rate_limit_headers(&headers).is_none());
    }

    #[test]
    fn parse_rate_limit_headers_out_of_range_reset_falls_back_to_now() {
        let headers = to_headers(vec![
            ("x-ratelimit-limit", "5000"),
            ("x-ratelimit-remaining", "10"),
            ("x-ratelimit-reset", "9223372036854775807"),
        ]);

        let before = Utc::now();
        let info = parse_rate_limit_headers(&headers).expect("headers should parse");
        assert!(info.reset_at >= before);
    }

    #[test]
    fn format_duration_handles_seconds_minutes_and_hours() {
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "0s");
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(120)), "2m");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(3600)), "1h");
        assert_eq!(format_duration(chrono::Duration::seconds(3900)), "1h 5m");
    }

    #[tokio::test]
    async fn api_rate_limiter_allows_first_request_immediately() {
        let limiter = ApiRateLimiter::new(100);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < StdDuration::from_millis(50));

        // Zero falls back to one request per second rather than panicking.
        let zero = ApiRateLimiter::new(0);
        zero.clone().wait().await;
    }
}
