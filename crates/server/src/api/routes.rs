use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::metrics_middleware;
use super::{handlers, mcp};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .with_state(Arc::clone(&state));

    // MCP transport: SSE handshake plus JSON-RPC messages
    let mcp_routes = Router::new()
        .route("/sse", get(mcp::sse))
        .route("/messages", post(mcp::messages))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/mcp", mcp_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
