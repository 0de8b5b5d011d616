//! Rate limiting middleware
//!
//! Sliding one-minute window per client. Clients are identified by the
//! first `X-Forwarded-For` entry, else the peer address.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window; 0 disables limiting
    pub max_requests: u32,
    /// Time window for rate limiting
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// In-memory sliding-window rate limiter
#[derive(Clone, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self::with_config(RateLimitConfig {
            max_requests: max_requests_per_minute,
            ..RateLimitConfig::default()
        })
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Arc::new(DashMap::new()),
        }
    }

    /// Record a request from `client_id` if it is under the limit
    pub fn check(&self, client_id: &str) -> bool {
        self.check_at(client_id, Instant::now())
    }

    fn check_at(&self, client_id: &str, now: Instant) -> bool {
        if self.config.max_requests == 0 {
            return true;
        }

        let mut requests = self.clients.entry(client_id.to_string()).or_default();

        while requests
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.config.window)
        {
            requests.pop_front();
        }

        if requests.len() >= self.config.max_requests as usize {
            warn!("Rate limit exceeded for client: {}", client_id);
            return false;
        }

        requests.push_back(now);
        true
    }

    /// Drop clients with no request inside the window
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.clients.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|t| now.duration_since(*t) <= window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Periodically run [`RateLimiter::cleanup`]
    pub fn start_cleanup_task(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(period);
            loop {
                interval.tick().await;
                self.cleanup();
                debug!("Rate limiter tracking {} clients", self.tracked_clients());
            }
        })
    }
}

/// Client identifier for a request
pub fn client_id(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_id(&request);
    if !limiter.check(&client) {
        return ApiError::RateLimited.into_response();
    }

    next.run(request).await
}
