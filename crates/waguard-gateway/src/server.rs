// SPDX-FileCopyrightText: 2026 Waguard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes, shared state, and the listener.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use waguard_core::GovernorError;
use waguard_governor::{Governor, RecalcQueue};

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// State for the unauthenticated liveness and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Renders the Prometheus exposition text, when an exporter is installed.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

#[derive(Clone)]
pub struct GatewayState {
    pub governor: Arc<Governor>,
    /// Present when queued recalculation is enabled.
    pub queue: Option<RecalcQueue>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Mirrors the gateway section of the config file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the full route table.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(handlers::get_liveness))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/v1/health/summary", get(handlers::get_summary))
        .route("/v1/health/recalculate", post(handlers::post_recalculate))
        .route("/v1/health/connections/{id}", get(handlers::get_connection))
        .route("/v1/health/connections/{id}/trend", get(handlers::get_trend))
        .route(
            "/v1/health/connections/{id}/force-cooldown",
            post(handlers::post_force_cooldown),
        )
        .route("/v1/health/connections/{id}/resume", post(handlers::post_resume))
        .route(
            "/v1/health/connections/{id}/force-resume",
            post(handlers::post_force_resume),
        )
        .route(
            "/v1/health/connections/{id}/reset-actions",
            post(handlers::post_reset_actions),
        )
        .route(
            "/v1/health/connections/{id}/force-reset-actions",
            post(handlers::post_force_reset_actions),
        )
        .route(
            "/v1/health/connections/{id}/history/states",
            get(handlers::get_state_history),
        )
        .route(
            "/v1/health/connections/{id}/history/limits",
            get(handlers::get_limit_history),
        )
        .route(
            "/v1/health/connections/{id}/history/blocks",
            get(handlers::get_block_history),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin surface until `shutdown` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), GovernorError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GovernorError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| GovernorError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
