//! Per-client rate limiting.
//!
//! Each policy keeps one token bucket per client IP. A bucket holds
//! `max_requests` tokens and refills them evenly over the policy window.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::metrics;

/// Window shared by every policy.
pub const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Buckets are pruned once a limiter tracks this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

/// Token bucket rate limiter.
///
/// Allows bursts up to `capacity` tokens, refilling at `refill_rate` tokens per second.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Current number of available tokens.
    tokens: f64,
    /// Maximum token capacity.
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last time tokens were refilled.
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a bucket that allows `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: capacity / window.as_secs_f64().max(f64::EPSILON),
            last_refill: Instant::now(),
        }
    }

    /// Try to consume one token. Returns true if allowed, false if rate limited.
    pub fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Return a token taken by a request that should not count.
    pub fn refund(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
        self.tokens = (self.tokens + new_tokens).min(self.capacity);
        self.last_refill = now;
    }

    /// Whether the bucket is back at full capacity.
    fn is_full(&mut self) -> bool {
        self.refill();
        self.tokens >= self.capacity
    }

    /// Get the time until the next token is available.
    ///
    /// Returns `None` if tokens are already available.
    #[must_use]
    pub fn time_until_available(&self) -> Option<Duration> {
        if self.tokens >= 1.0 {
            None
        } else {
            let needed = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(needed / self.refill_rate))
        }
    }
}

/// A named limit and the response sent when it is exceeded.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    /// Metrics label.
    pub name: &'static str,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Refill window.
    pub window: Duration,
    /// Error title in the 429 body.
    pub error: &'static str,
    /// Explanation in the 429 body.
    pub message: &'static str,
    /// Give the token back when the request fails.
    pub skip_failed: bool,
}

impl RatePolicy {
    /// Every request, every route.
    pub const GLOBAL: Self = Self {
        name: "global",
        max_requests: 100,
        window: WINDOW,
        error: "Too many requests",
        message: "You have exceeded the rate limit. Please try again later.",
        skip_failed: false,
    };

    /// Image uploads and background removal.
    pub const UPLOAD: Self = Self {
        name: "upload",
        max_requests: 20,
        window: WINDOW,
        error: "Upload limit exceeded",
        message: "Too many file uploads. Please wait before uploading more files.",
        skip_failed: true,
    };

    /// PDF guideline analysis.
    pub const AI_ANALYSIS: Self = Self {
        name: "ai_analysis",
        max_requests: 10,
        window: WINDOW,
        error: "AI analysis limit exceeded",
        message: "Too many PDF analysis requests. This is a computationally intensive operation.",
        skip_failed: false,
    };

    /// Export optimization.
    pub const EXPORT: Self = Self {
        name: "export",
        max_requests: 30,
        window: WINDOW,
        error: "Export limit exceeded",
        message: "Too many export requests. Please wait before exporting more images.",
        skip_failed: false,
    };

    /// Human-readable window, e.g. "15 minutes".
    #[must_use]
    pub fn window_label(&self) -> String {
        format!("{} minutes", self.window.as_secs() / 60)
    }
}

/// Rate limiter keyed by client IP.
#[derive(Debug)]
pub struct ClientRateLimiter {
    policy: RatePolicy,
    buckets: Mutex<HashMap<IpAddr, RateLimiter>>,
}

impl ClientRateLimiter {
    /// Create a limiter for a policy.
    #[must_use]
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// The enforced policy.
    #[must_use]
    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Take a token for `client`.
    ///
    /// # Errors
    ///
    /// Returns the wait until the next token when the client is limited.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| !bucket.is_full());
        }
        let bucket = buckets
            .entry(client)
            .or_insert_with(|| RateLimiter::new(self.policy.max_requests, self.policy.window));
        if bucket.try_consume() {
            Ok(())
        } else {
            Err(bucket.time_until_available().unwrap_or(Duration::ZERO))
        }
    }

    /// Give a token back to `client`.
    pub fn refund(&self, client: IpAddr) {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bucket) = buckets.get_mut(&client) {
            bucket.refund();
        }
    }
}

/// One limiter per policy.
#[derive(Debug, Clone)]
pub struct RateLimiters {
    /// Applied to every request.
    pub global: Arc<ClientRateLimiter>,
    /// Uploads and background removal share this bucket.
    pub upload: Arc<ClientRateLimiter>,
    /// Guideline analysis.
    pub ai_analysis: Arc<ClientRateLimiter>,
    /// Export optimization.
    pub export: Arc<ClientRateLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self {
            global: Arc::new(ClientRateLimiter::new(RatePolicy::GLOBAL)),
            upload: Arc::new(ClientRateLimiter::new(RatePolicy::UPLOAD)),
            ai_analysis: Arc::new(ClientRateLimiter::new(RatePolicy::AI_ANALYSIS)),
            export: Arc::new(ClientRateLimiter::new(RatePolicy::EXPORT)),
        }
    }
}

/// Client IP from the connection, or unspecified when unknown.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| {
            addr.ip()
        })
}

/// Middleware enforcing a [`ClientRateLimiter`].
pub async fn enforce(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);
    let policy = *limiter.policy();

    if let Err(wait) = limiter.check(client) {
        tracing::warn!(%client, policy = policy.name, "rate limit exceeded");
        metrics::record_rate_limited(policy.name);
        return ApiError::RateLimited {
            error: policy.error,
            message: policy.message,
            retry_after: wait.as_secs().max(1),
        }
        .into_response();
    }

    let response = next.run(request).await;
    let status = response.status();
    if policy.skip_failed && (status.is_client_error() || status.is_server_error()) {
        limiter.refund(client);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_bucket_allows_burst_then_limits() {
        let mut limiter = RateLimiter::new(5, WINDOW);
        for _ in 0..5 {
            assert!(limiter.try_consume());
        }
        assert!(!limiter.try_consume());
        let wait = limiter.time_until_available().expect("should wait");
        // one token per 180 seconds at 5 per 15 minutes
        assert!(wait <= Duration::from_secs(180));
        assert!(wait > Duration::from_secs(170));
    }

    #[test]
    fn test_bucket_refills_over_window() {
        let mut limiter = RateLimiter::new(10, WINDOW);
        for _ in 0..10 {
            assert!(limiter.try_consume());
        }
        assert!(!limiter.try_consume());

        limiter.last_refill = Instant::now()
            .checked_sub(WINDOW)
            .expect("instant in range");
        for _ in 0..10 {
            assert!(limiter.try_consume());
        }
        assert!(!limiter.try_consume());
    }

    #[test]
    fn test_refund_is_capped() {
        let mut limiter = RateLimiter::new(2, WINDOW);
        limiter.refund();
        assert!(limiter.try_consume());
        assert!(limiter.try_consume());
        assert!(!limiter.try_consume());
        limiter.refund();
        assert!(limiter.try_consume());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = ClientRateLimiter::new(RatePolicy {
            max_requests: 1,
            ..RatePolicy::AI_ANALYSIS
        });
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!(limiter.check(CLIENT).is_ok());
        assert!(limiter.check(CLIENT).is_err());
        assert!(limiter.check(other).is_ok());
    }

    #[test]
    fn test_client_refund() {
        let limiter = ClientRateLimiter::new(RatePolicy {
            max_requests: 1,
            ..RatePolicy::UPLOAD
        });
        assert!(limiter.check(CLIENT).is_ok());
        limiter.refund(CLIENT);
        assert!(limiter.check(CLIENT).is_ok());
        assert!(limiter.check(CLIENT).is_err());
    }

    #[test]
    fn test_policy_limits() {
        assert_eq!(RatePolicy::GLOBAL.max_requests, 100);
        assert_eq!(RatePolicy::UPLOAD.max_requests, 20);
        assert_eq!(RatePolicy::AI_ANALYSIS.max_requests, 10);
        assert_eq!(RatePolicy::EXPORT.max_requests, 30);
        assert_eq!(RatePolicy::GLOBAL.window_label(), "15 minutes");
        assert!(RatePolicy::UPLOAD.skip_failed);
    }
}
