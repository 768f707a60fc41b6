use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{api_key_middleware, metrics_middleware};
use super::{handlers, pipeline};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Mutating routes, guarded by the optional API key
    let protected = Router::new()
        .route("/pipeline/trigger", post(pipeline::trigger))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            api_key_middleware,
        ));

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Pipeline
        .route("/pipeline/status", get(pipeline::status))
        .route("/pipeline/history", get(pipeline::history))
        .route("/pipeline/executions/{id}", get(pipeline::get_execution))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
