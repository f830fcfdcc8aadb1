//! # Request Metrics
//!
//! Two layers of counting. [`ApiMetrics`] keeps in-process atomic totals
//! that tests and the readiness probe can read directly. Every request is
//! also reported through the `metrics` facade (`dealroom_http_requests_total`
//! and `dealroom_http_request_duration_seconds`), which the Prometheus
//! recorder installed in `main` renders at `/metrics`. Without an installed
//! recorder the facade calls are no-ops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let counters = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    // Route template, so ids do not explode label cardinality.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    if let Some(m) = counters {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() || status.is_server_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
    let status = status.as_u16().to_string();
    metrics::counter!(
        "dealroom_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "dealroom_http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(started.elapsed().as_secs_f64());

    response
}
