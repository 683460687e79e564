use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{content, handlers, hooks, publish};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Editor-facing routes, behind auth
    let protected = Router::new()
        .route("/config", get(handlers::get_config))
        // Publish jobs
        .route("/publish", post(publish::submit))
        .route("/publish/{job_id}", get(publish::get_job))
        // Content records
        .route(
            "/content",
            get(content::list_content).post(content::create_content),
        )
        .route("/content/{id}", get(content::get_content))
        .route("/content/{id}", patch(content::update_content))
        // Site hooks
        .route("/preview", post(hooks::preview))
        .route("/deploy", post(hooks::deploy))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
