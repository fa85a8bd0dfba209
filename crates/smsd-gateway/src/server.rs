// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use smsd_config::ServerConfig;
use smsd_core::{SmsModem, SmsdError};
use smsd_queue::Scheduler;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{handlers, sse};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Queue that accepted messages are handed to.
    pub scheduler: Arc<Scheduler>,
    /// Modem used for direct signal queries.
    pub modem: Arc<dyn SmsModem>,
    /// Whether `/api/events` is served.
    pub dashboard: bool,
}

impl GatewayState {
    pub fn new(scheduler: Arc<Scheduler>, modem: Arc<dyn SmsModem>, dashboard: bool) -> Self {
        Self {
            scheduler,
            modem,
            dashboard,
        }
    }
}

/// Build the router for all API routes.
///
/// - GET / (liveness)
/// - GET /api/sms/queue
/// - GET /api/sms/log
/// - GET /api/modem/signal
/// - POST /api/sms
/// - GET /api/events (only with the dashboard enabled)
pub fn router(state: GatewayState) -> Router {
    let mut api = Router::new()
        .route("/", get(handlers::get_status))
        .route("/api/sms", post(handlers::post_sms))
        .route("/api/sms/queue", get(handlers::get_queue))
        .route("/api/sms/log", get(handlers::get_log))
        .route("/api/modem/signal", get(handlers::get_signal));

    if state.dashboard {
        api = api.route("/api/events", get(sse::get_events));
    }

    api.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the configured address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, SmsdError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| SmsdError::transport(format!("failed to bind HTTP server to {addr}"), e))
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), SmsdError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, dashboard = state.dashboard, "HTTP server listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SmsdError::transport("HTTP server error", e))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Bind and serve in one step.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), SmsdError> {
    let listener = bind(config).await?;
    serve(listener, state, shutdown).await
}
