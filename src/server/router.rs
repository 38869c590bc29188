use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers;
use crate::state::AppState;

/// The application router: health check plus the query, gated-answer,
/// and raw-search endpoints, behind permissive CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/query", post(handlers::query))
        .route("/api/answer", post(handlers::answer))
        .route("/api/search", post(handlers::search))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
