//! HTTP Server - Application Assembly and Serving
//!
//! Mounts the record routes under the API prefix, the media directory
//! under the media URL and the health probes at the root, then wraps
//! everything in body-limit, tracing and (optional) CORS layers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tokio::sync::{broadcast, watch};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::health::{self, HealthState};
use super::routes::{self, ApiState};
use crate::config::AppConfig;
use crate::ports::{BlobStore, RecordStore};
use crate::usecases::RecordService;

/// Build the complete application router.
///
/// `media_root` is served read-only when `media.base_url` is a local
/// path; an absolute URL means some other host serves the files.
pub fn build_app<S: RecordStore, B: BlobStore>(
    config: &AppConfig,
    service: Arc<RecordService<S, B>>,
    media_root: &Path,
    accepting: watch::Receiver<bool>,
) -> Result<Router> {
    let api = routes::router(ApiState::new(Arc::clone(&service), &config.media.base_url));

    let mut app = if config.server.api_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&config.server.api_prefix, api)
    };

    let media_mount = config.media.base_url.trim_end_matches('/');
    if media_mount.starts_with('/') {
        let media = Router::new()
            .nest_service(media_mount, ServeDir::new(media_root))
            .layer(middleware::from_fn(hide_private_media));
        app = app.merge(media);
    }

    app = app
        .merge(health::router(HealthState::new(service, accepting)))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&config.server.cors_allowed_origins)? {
        app = app.layer(cors);
    }

    Ok(app)
}

/// Dot-files under the media root (in-progress writes, the readiness
/// probe file) are never served.
async fn hide_private_media(request: Request, next: Next) -> Response {
    if is_private_media_path(request.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

fn is_private_media_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// CORS for the configured browser origins; `None` when the list is empty.
fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin: {o}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([CONTENT_TYPE]),
    ))
}

/// Axum-based HTTP server for the record API.
pub struct HttpServer {
    /// Fully assembled router.
    app: Router,
    /// Socket address to bind.
    bind_address: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(app: Router, bind_address: impl Into<String>) -> Self {
        Self {
            app,
            bind_address: bind_address.into(),
        }
    }

    /// Serve until a shutdown signal arrives, then drain in-flight requests.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_address))?;

        info!("HTTP server started");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
