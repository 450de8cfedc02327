//! `/metrics` and `/health` endpoints for a running filter.

use crate::filter::Controller;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind metrics listener on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("metrics listener failed: {0}")]
    Serve(io::Error),
}

/// What a scrape reads: the registry and, optionally, the filter it is
/// refreshed from.
struct Scrape {
    registry: MetricsRegistry,
    controller: Option<Controller>,
}

impl Scrape {
    fn render(&self) -> Result<String, crate::metrics::MetricsError> {
        if let Some(controller) = &self.controller {
            let snapshot = MetricsSnapshot::from_stats(&controller.stats(), controller.slot_state());
            self.registry.update(&snapshot);
        }
        self.registry.encode()
    }
}

/// Serves the registry over HTTP until the listener fails.
pub struct MetricsServer {
    addr: SocketAddr,
    scrape: Scrape,
}

impl MetricsServer {
    /// Listens on all interfaces at `port`.
    pub fn new(port: u16, registry: MetricsRegistry) -> Self {
        Self {
            addr: ([0, 0, 0, 0], port).into(),
            scrape: Scrape {
                registry,
                controller: None,
            },
        }
    }

    /// Refreshes the registry from `controller` on every scrape.
    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.scrape.controller = Some(controller);
        self
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.addr;
        let app = Router::new()
            .route("/metrics", get(metrics))
            .route("/health", get(|| async { (StatusCode::OK, "OK") }))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.scrape));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        tracing::info!(%addr, "metrics endpoint up");

        axum::serve(listener, app).await.map_err(ServerError::Serve)
    }
}

async fn metrics(State(scrape): State<Arc<Scrape>>) -> impl IntoResponse {
    match scrape.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string(),
        ),
    }
}
