//! # Per-Caller Rate Limiting
//!
//! Fixed-window limiter keyed by the authenticated user id. Callers without
//! a user id (operators in development mode) share the `anonymous` bucket.
//! Must run inside the auth middleware so the identity is available.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::auth::CallerIdentity;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1000,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started: Instant,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `key`. `false` once the window is exhausted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.duration_since(window.started) >= self.config.window {
            window.count = 0;
            window.started = now;
        }
        if window.count >= self.config.max_requests {
            false
        } else {
            window.count += 1;
            true
        }
    }
}

pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };
    let key = request
        .extensions()
        .get::<CallerIdentity>()
        .and_then(|c| c.user_id)
        .map(|u| u.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&key) {
        tracing::warn!(key = %key, "rate limit exceeded");
        return AppError::RateLimited("rate limit exceeded".into()).into_response();
    }
    next.run(request).await
}
