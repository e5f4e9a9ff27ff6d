//! Health Check Routes - Liveness and Readiness Probes
//!
//! Exposes /live and /ready for container health checks. Readiness
//! depends on the store and blob area, and flips to 503 once
//! graceful shutdown has begun.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::watch;

use crate::ports::{BlobStore, RecordStore};
use crate::usecases::RecordService;

/// Shared health state polled by readiness probes.
pub struct HealthState<S: RecordStore, B: BlobStore> {
    /// Service whose ports are probed.
    service: Arc<RecordService<S, B>>,
    /// `false` once shutdown has started.
    accepting: watch::Receiver<bool>,
}

impl<S: RecordStore, B: BlobStore> Clone for HealthState<S, B> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            accepting: self.accepting.clone(),
        }
    }
}

impl<S: RecordStore, B: BlobStore> HealthState<S, B> {
    pub fn new(service: Arc<RecordService<S, B>>, accepting: watch::Receiver<bool>) -> Self {
        Self { service, accepting }
    }

    /// Check if the service is ready to serve traffic.
    pub async fn is_ready(&self) -> bool {
        let accepting = *self.accepting.borrow();
        accepting && self.service.is_healthy().await
    }
}

/// Build the probe router.
pub fn router<S: RecordStore, B: BlobStore>(state: HealthState<S, B>) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness::<S, B>))
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: returns 200 only if store + blobs are healthy.
async fn readiness<S: RecordStore, B: BlobStore>(
    State(state): State<HealthState<S, B>>,
) -> impl IntoResponse {
    if state.is_ready().await {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
