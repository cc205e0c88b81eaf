//! Fixed-window rate limiting per client.
//!
//! Each client key owns one record: a counter and the instant its window
//! ends. The first request after the window ends starts a new window with a
//! count of one. Expired records are removed by a periodic sweep rather than
//! on every check.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::http::error::{render_for_path, EdgeError};
use crate::observability::metrics;

/// Key shared by every request whose origin cannot be attributed.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny,
}

impl RateDecision {
    pub fn is_allowed(self) -> bool {
        self == RateDecision::Allow
    }
}

/// Per-client window state.
#[derive(Debug, Clone)]
struct ClientRecord {
    count: u32,
    window_reset_at: Instant,
}

/// Fixed-window limiter shared across request tasks.
///
/// The read-check-increment for a key runs under that key's map entry
/// guard, so it is atomic per key on a multi-threaded runtime.
#[derive(Debug)]
pub struct RateLimiter {
    clients: DashMap<String, ClientRecord>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            clients: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and count a request from `client_key`.
    pub fn check(&self, client_key: &str) -> RateDecision {
        self.check_at(client_key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, client_key: &str, now: Instant) -> RateDecision {
        let mut record = self
            .clients
            .entry(client_key.to_string())
            .or_insert_with(|| ClientRecord {
                count: 0,
                window_reset_at: now + self.window,
            });

        if now > record.window_reset_at {
            record.count = 1;
            record.window_reset_at = now + self.window;
            return RateDecision::Allow;
        }

        if record.count < self.max_requests {
            record.count += 1;
            RateDecision::Allow
        } else {
            RateDecision::Deny
        }
    }

    /// Drop every record whose window has ended. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, record| now <= record.window_reset_at);
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Sweep once per window until shutdown.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.window);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep(Instant::now());
                    if removed > 0 {
                        tracing::debug!(
                            removed_entries = removed,
                            remaining_entries = self.tracked_clients(),
                            "Rate limiter sweep completed"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limiter sweeper stopping");
                    break;
                }
            }
        }
    }
}

/// Derive the client key: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket address, then [`UNKNOWN_CLIENT`].
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

/// Middleware rejecting over-limit clients with 429.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    if limiter.check(&key).is_allowed() {
        return next.run(request).await;
    }

    tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
    metrics::record_rate_limited();
    render_for_path(request.uri().path(), EdgeError::RateLimited).into_response()
}
