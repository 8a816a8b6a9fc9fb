//! In-process request counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ApiError;

/// Seconds covered by the requests-per-minute figure.
const RECENT_SECONDS: u64 = 60;

/// Per-second request counts over the trailing minute.
#[derive(Debug)]
struct RecentRequests {
    slots: [(u64, u64); RECENT_SECONDS as usize],
}

impl RecentRequests {
    const fn new() -> Self {
        Self {
            slots: [(0, 0); RECENT_SECONDS as usize],
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bump(&mut self, second: u64) {
        let slot = &mut self.slots[(second % RECENT_SECONDS) as usize];
        if slot.0 != second {
            *slot = (second, 0);
        }
        slot.1 += 1;
    }

    fn total(&self, now: u64) -> u64 {
        self.slots
            .iter()
            .filter(|(second, _)| *second <= now && now - *second < RECENT_SECONDS)
            .map(|(_, count)| count)
            .sum()
    }
}

/// Gateway counters, shared by the pipeline and the metrics endpoint.
#[derive(Debug)]
pub struct Metrics {
    started_at: Instant,
    requests_total: AtomicU64,
    requests_inflight: AtomicU64,
    status_2xx: AtomicU64,
    status_4xx: AtomicU64,
    status_5xx: AtomicU64,
    auth_rejections: AtomicU64,
    rate_limited: AtomicU64,
    payload_too_large: AtomicU64,
    cancelled: AtomicU64,
    duration_micros: AtomicU64,
    recent: Mutex<RecentRequests>,
}

/// Point-in-time view of [`Metrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Calls seen since startup.
    pub requests_total: u64,
    /// Calls seen in the trailing minute.
    pub requests_per_minute: u64,
    /// Mean latency of completed calls.
    pub average_response_time_ms: f64,
    /// Open streaming sessions.
    pub active_connections: usize,
    /// Seconds since startup.
    pub uptime_seconds: u64,
    /// Calls currently being handled.
    pub requests_inflight: u64,
    /// Completed calls with a 2xx status.
    pub responses_2xx: u64,
    /// Completed calls with a 4xx status.
    pub responses_4xx: u64,
    /// Completed calls with a 5xx status.
    pub responses_5xx: u64,
    /// Calls refused by the auth gate.
    pub auth_rejections: u64,
    /// Calls refused by the rate limiter.
    pub rate_limited: u64,
    /// Calls refused for body size.
    pub payload_too_large: u64,
    /// Calls abandoned by the client before a response was produced.
    pub requests_cancelled: u64,
}

impl Metrics {
    /// Create zeroed counters; uptime starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_total: AtomicU64::new(0),
            requests_inflight: AtomicU64::new(0),
            status_2xx: AtomicU64::new(0),
            status_4xx: AtomicU64::new(0),
            status_5xx: AtomicU64::new(0),
            auth_rejections: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            payload_too_large: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            duration_micros: AtomicU64::new(0),
            recent: Mutex::new(RecentRequests::new()),
        }
    }

    /// Count a call entering the pipeline.
    pub fn request_started(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_inflight.fetch_add(1, Ordering::Relaxed);
        let second = self.started_at.elapsed().as_secs();
        self.recent.lock().bump(second);
    }

    /// Count a call leaving the pipeline.
    pub fn request_finished(&self, status: StatusCode, elapsed: Duration) {
        self.requests_inflight.fetch_sub(1, Ordering::Relaxed);
        let class = match status.as_u16() {
            200..=299 => Some(&self.status_2xx),
            400..=499 => Some(&self.status_4xx),
            500..=599 => Some(&self.status_5xx),
            _ => None,
        };
        if let Some(counter) = class {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.duration_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Count a call dropped before it produced a response.
    pub fn request_cancelled(&self, elapsed: Duration) {
        self.requests_inflight.fetch_sub(1, Ordering::Relaxed);
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.duration_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Count a gate rejection.
    pub fn record_rejection(&self, err: &ApiError) {
        let counter = match err {
            ApiError::MissingCredential
            | ApiError::MalformedCredential
            | ApiError::InvalidCredential => &self.auth_rejections,
            ApiError::RateLimitExceeded { .. } => &self.rate_limited,
            ApiError::PayloadTooLarge => &self.payload_too_large,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot, given the current number of streaming sessions.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self, active_connections: usize) -> MetricsSnapshot {
        let total = self.requests_total.load(Ordering::Relaxed);
        let inflight = self.requests_inflight.load(Ordering::Relaxed);
        let completed = total.saturating_sub(inflight);
        let micros = self.duration_micros.load(Ordering::Relaxed);
        let average_response_time_ms = if completed == 0 {
            0.0
        } else {
            micros as f64 / completed as f64 / 1000.0
        };
        let uptime = self.started_at.elapsed().as_secs();

        MetricsSnapshot {
            requests_total: total,
            requests_per_minute: self.recent.lock().total(uptime),
            average_response_time_ms,
            active_connections,
            uptime_seconds: uptime,
            requests_inflight: inflight,
            responses_2xx: self.status_2xx.load(Ordering::Relaxed),
            responses_4xx: self.status_4xx.load(Ordering::Relaxed),
            responses_5xx: self.status_5xx.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            payload_too_large: self.payload_too_large.load(Ordering::Relaxed),
            requests_cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
