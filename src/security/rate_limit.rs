//! Per-client rate limiting middleware.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::manager::{ConfigWatcher, WatcherResult};
use crate::config::schema::GatewayConfig;
use crate::http::response::ApiResponse;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Buckets untouched for this long are dropped. A bucket refills completely
/// within one second, so anything older is indistinguishable from a new one.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60);

/// Token buckets keyed by client IP. Burst equals the per-second rate;
/// a rate of zero disables limiting.
///
/// Idle buckets are swept at most once per `idle_ttl`, from within
/// [`RateLimiter::check`].
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    rps: AtomicU64,
    idle_ttl: Duration,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(rps: u64) -> Self {
        Self::with_idle_ttl(rps, DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(rps: u64, idle_ttl: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            rps: AtomicU64::new(rps),
            idle_ttl,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn rps(&self) -> u64 {
        self.rps.load(Ordering::Relaxed)
    }

    pub fn set_rps(&self, rps: u64) {
        if self.rps.swap(rps, Ordering::Relaxed) != rps {
            self.buckets.clear();
            tracing::info!(rps, "Rate limit changed");
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let rps = self.rps();
        if rps == 0 {
            return true;
        }
        self.maybe_sweep();

        let rate = rps as f64;
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(rate));
        bucket.try_acquire(rate, rate)
    }

    /// Drop buckets idle for at least `idle`. Returns how many were removed.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.last_update.elapsed() < idle);
        before.saturating_sub(self.buckets.len())
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    // Must not run while a bucket entry is held: retain locks every shard.
    fn maybe_sweep(&self) {
        let Some(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if last.elapsed() < self.idle_ttl {
            return;
        }
        *last = Instant::now();
        drop(last);

        let evicted = self.evict_idle(self.idle_ttl);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.buckets.len(), "Evicted idle rate limit buckets");
        }
    }
}

#[async_trait]
impl ConfigWatcher for RateLimiter {
    fn name(&self) -> &str {
        "rate-limiter"
    }

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult {
        self.set_rps(u64::try_from(config.rate_limit).unwrap_or(0));
        Ok(())
    }
}

/// Middleware function for per-IP rate limiting.
///
/// Requests without connection info (in-process tests) share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        let status = StatusCode::TOO_MANY_REQUESTS;
        (
            status,
            Json(ApiResponse::<()>::error(status, "Too many requests, please try again later")),
        )
            .into_response()
    }
}
