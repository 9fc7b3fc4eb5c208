use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use dcpr_retrieval::SessionId;

use crate::dto::{
    AskRequest, AskResponse, FeedbackRequest, FeedbackScore, SessionDetailResponse,
    SessionResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let id = state.sessions.create();
    let summary = state.sessions.summary(id)?;

    tracing::info!(session_id = %id, "Session created");

    Ok((StatusCode::CREATED, Json(summary.into())))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionResponse>> {
    Json(state.sessions.list().into_iter().map(SessionResponse::from).collect())
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, ApiError> {
    let id: SessionId = id.parse()?;
    let session = state.sessions.summary(id)?.into();
    let history = state.sessions.transcript(id)?;

    Ok(Json(SessionDetailResponse { session, history }))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: SessionId = id.parse()?;
    state.sessions.delete(id)?;

    tracing::info!(session_id = %id, "Session deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let id: SessionId = id.parse()?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question must not be empty"));
    }

    let result = state.sessions.ask(id, question, state.pipeline.as_ref()).await?;

    Ok(Json(AskResponse::from(&result)))
}

pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: SessionId = id.parse()?;
    state.sessions.clear(id)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Result<StatusCode, ApiError> {
    let id: SessionId = id.parse()?;

    state.sessions.record_feedback(
        id,
        request.turn,
        request.score == FeedbackScore::Up,
        request.comment.as_deref(),
    )?;

    Ok(StatusCode::ACCEPTED)
}
