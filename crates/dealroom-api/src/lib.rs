//! # dealroom-api: HTTP Service
//!
//! Axum service over the deal room aggregate.
//!
//! ## Layout
//!
//! - [`state`] holds deal rooms in a generic in-memory [`state::Store`] and
//!   runs every mutation through one atomic, version-checked transaction.
//! - [`routes`] maps the negotiation operations onto `/v1/*` endpoints.
//! - [`auth`] turns bearer tokens into a [`auth::CallerIdentity`].
//! - [`audit`] is the hash-chained audit sink; [`db`] optionally mirrors
//!   snapshots and audit entries to Postgres.
//!
//! ## Middleware order
//!
//! Outermost first: trace, metrics, auth, rate limit. Health probes and
//! `/metrics` sit outside auth.

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    let api = Router::new()
        .merge(routes::catalog::router())
        .merge(routes::deals::router())
        .merge(routes::selections::router())
        .merge(routes::negotiation::router())
        .merge(routes::signing::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state.clone());

    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(public).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready once the catalog has templates to create deals from.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.catalog.list().is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no contract templates loaded")
    } else {
        (StatusCode::OK, "ready")
    }
}

async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match (&state.prometheus, state.config.metrics_enabled) {
        (Some(handle), true) => (StatusCode::OK, handle.render()),
        _ => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
