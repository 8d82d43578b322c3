//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use remindr_core::config::GatewayConfig;
use remindr_scheduler::ReminderService;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReminderService>,
    pub start_time: std::time::Instant,
    /// Cancelled when the server begins shutting down. Runs that have not
    /// started dispatching by then are refused.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: Arc<ReminderService>, shutdown: CancellationToken) -> Self {
        Self {
            service,
            start_time: std::time::Instant::now(),
            shutdown,
        }
    }
}

/// Build the router. Any method other than the listed one gets 405 before the body is read.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(super::routes::notify))
        .route("/api/v1/notify", post(super::routes::notify))
        .route("/health", get(super::routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the state's shutdown token is cancelled. In-flight requests finish first.
pub async fn start_server(config: &GatewayConfig, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}
