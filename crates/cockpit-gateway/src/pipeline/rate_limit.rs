//! Per-client request ceilings.
//!
//! Each client has two fixed windows, one minute and one hour, that reset
//! independently once their period has elapsed since their own start.
//! Calls that are rejected do not consume quota.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;

use super::{Decision, Gate, RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING};
use crate::context::RequestContext;
use crate::error::ApiError;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Bucket count above which idle buckets are pruned on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    const fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
        }
    }

    fn elapsed(&self, now: Instant, period: Duration) -> bool {
        now.saturating_duration_since(self.started) >= period
    }

    fn roll(&mut self, now: Instant, period: Duration) {
        if self.elapsed(now, period) {
            *self = Self::new(now);
        }
    }

    fn retry_after(&self, now: Instant, period: Duration) -> Duration {
        period.saturating_sub(now.saturating_duration_since(self.started))
    }
}

/// Counters for one client.
#[derive(Debug, Clone, Copy)]
struct RateLimitBucket {
    minute: Window,
    hour: Window,
}

impl RateLimitBucket {
    const fn new(now: Instant) -> Self {
        Self {
            minute: Window::new(now),
            hour: Window::new(now),
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.minute.elapsed(now, MINUTE) && self.hour.elapsed(now, HOUR)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The call was counted.
    Allowed {
        /// Calls left in the tighter of the two windows.
        remaining: u32,
    },
    /// The client is over a ceiling.
    Limited {
        /// Time until the exhausted window(s) reset.
        retry_after: Duration,
    },
}

/// Fixed-window limiter keyed by client.
#[derive(Debug)]
pub struct RateLimiter {
    per_minute: u32,
    per_hour: u32,
    buckets: Mutex<HashMap<String, RateLimitBucket>>,
}

impl RateLimiter {
    /// Create a limiter with the given ceilings.
    #[must_use]
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            per_minute,
            per_hour,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Per-minute ceiling.
    #[must_use]
    pub const fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Count a call from `client` at `now`, unless it is over a ceiling.
    pub fn check(&self, client: &str, now: Instant) -> RateDecision {
        let mut buckets = self.buckets.lock();
        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| !bucket.is_idle(now));
        }

        let bucket = buckets
            .entry(client.to_string())
            .or_insert_with(|| RateLimitBucket::new(now));
        bucket.minute.roll(now, MINUTE);
        bucket.hour.roll(now, HOUR);

        let minute_full = bucket.minute.count >= self.per_minute;
        let hour_full = bucket.hour.count >= self.per_hour;
        if minute_full || hour_full {
            let mut retry_after = Duration::ZERO;
            if minute_full {
                retry_after = retry_after.max(bucket.minute.retry_after(now, MINUTE));
            }
            if hour_full {
                retry_after = retry_after.max(bucket.hour.retry_after(now, HOUR));
            }
            return RateDecision::Limited { retry_after };
        }

        bucket.minute.count += 1;
        bucket.hour.count += 1;
        RateDecision::Allowed {
            remaining: (self.per_minute - bucket.minute.count)
                .min(self.per_hour - bucket.hour.count),
        }
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}

/// Whole seconds to wait, rounded up and never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Pipeline adapter around [`RateLimiter`].
#[derive(Debug)]
pub struct RateLimitGate {
    limiter: RateLimiter,
}

impl RateLimitGate {
    /// Create a gate with the given ceilings.
    #[must_use]
    pub fn new(per_minute: u32, per_hour: u32) -> Self {
        Self {
            limiter: RateLimiter::new(per_minute, per_hour),
        }
    }
}

impl Gate for RateLimitGate {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn evaluate(&self, ctx: &RequestContext, annotations: &mut HeaderMap) -> Decision {
        match self.limiter.check(&ctx.client, Instant::now()) {
            RateDecision::Allowed { remaining } => {
                annotations.insert(
                    RATE_LIMIT_LIMIT,
                    HeaderValue::from(self.limiter.per_minute()),
                );
                annotations.insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
                Decision::Allow
            }
            RateDecision::Limited { retry_after } => {
                let retry_after_secs = retry_after_secs(retry_after);
                tracing::warn!(
                    client = %ctx.client,
                    path = %ctx.path,
                    retry_after_secs,
                    "rate_limit_exceeded"
                );
                Decision::Reject(ApiError::RateLimitExceeded {
                    limit: self.limiter.per_minute(),
                    retry_after_secs,
                })
            }
        }
    }
}
