use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))

        // Sessions
        .route("/api/v1/sessions", post(handlers::create_session).get(handlers::list_sessions))
        .route("/api/v1/sessions/{id}", get(handlers::get_session).delete(handlers::delete_session))
        .route("/api/v1/sessions/{id}/ask", post(handlers::ask))
        .route("/api/v1/sessions/{id}/history", delete(handlers::clear_history))
        .route("/api/v1/sessions/{id}/feedback", post(handlers::submit_feedback))

        // Index
        .route("/api/v1/index/reload", post(handlers::reload_index))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
