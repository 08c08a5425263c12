//! # credchain-api: HTTP Surface for the Credential Registry
//!
//! Axum service exposing credchain to issuer tooling:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /api/compute` | canonical form and hash of a credential |
//! | `POST /api/pdf-to-json` | certificate PDF to credential (alias `/api/compute-from-pdf`) |
//! | `POST /api/batch` | CSV rows to credentials and hashes |
//! | `POST /api/verify` | ledger scan for a credential or hash |
//! | `POST /api/issue` | record one hash on the ledger |
//! | `POST /api/batch/issue` | sequential CSV issuance with a per-row report |
//! | `GET /api/wallet/:subject` | all records of a subject |
//!
//! Health probes, `/metrics` and `/openapi.json` sit beside the API routes.
//!
//! ## Crate Policy
//!
//! - Handlers are thin: hashing, scanning and batching live in
//!   `credchain-engine`.
//! - Errors flow through [`error::AppError`]; internal details never reach
//!   clients.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use credchain_core::Address;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, BODY_LIMIT_BYTES};

/// Assemble the full application router with all routes and middleware.
///
/// Middleware order (outermost first): TraceLayer, metrics, body limit,
/// handler.
pub fn app(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::compute::router())
        .merge(routes::registry::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(axum::Extension(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Without a registry the server is ready: registry routes answer 503 by
/// themselves. With one, a `getCount` read must succeed.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(registry) = &state.registry {
        if let Err(e) = registry.get_count(Address::from_bytes([0u8; 20])).await {
            tracing::warn!("Registry health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "registry unreachable").into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}
