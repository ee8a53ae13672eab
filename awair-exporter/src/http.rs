//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::collector::SharedCollector;

/// Liveness endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Readiness endpoint path.
pub const READY_PATH: &str = "/ready";

/// Paths the metrics endpoint must not reuse.
pub const RESERVED_PATHS: &[&str] = &[HEALTH_PATH, READY_PATH];

/// Content type of the OpenMetrics text exposition.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
}

/// Create the HTTP router.
fn create_router(collector: SharedCollector, metrics_path: &str) -> Router {
    let state = AppState { collector };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(READY_PATH, get(ready_handler))
        .with_state(state)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.collector.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics\n").into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.collector.has_reading() {
        (StatusCode::OK, "ready\n").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready - no reading received yet\n",
        )
            .into_response()
    }
}

/// HTTP server bound to its listen address.
pub struct HttpServer {
    collector: SharedCollector,
    listener: TcpListener,
    metrics_path: String,
}

impl HttpServer {
    /// Bind the listen address.
    pub async fn bind(
        collector: SharedCollector,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: listen_addr,
                source,
            })?;

        Ok(Self {
            collector,
            listener,
            metrics_path,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        let router = create_router(self.collector, &self.metrics_path);

        if let Ok(addr) = self.listener.local_addr() {
            info!(addr = %addr, path = %self.metrics_path, "HTTP server listening");
        }

        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(ServerError::Serve)?;

        info!("HTTP server stopped");
        Ok(())
    }
}
