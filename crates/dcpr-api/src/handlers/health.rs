use axum::{extract::State, response::IntoResponse, Json};
use dcpr_store::ports::VectorIndex;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::ok(state.pipeline.index().len()))
}
