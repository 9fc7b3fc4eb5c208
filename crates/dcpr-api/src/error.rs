use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dcpr_core::error::DcprError;
use serde::Serialize;

/// Unified API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,

    /// Whether repeating the request may succeed
    pub retryable: bool,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), details: None, retryable: false }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    retryable: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            details: self.details,
            retryable: self.retryable,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<DcprError> for ApiError {
    fn from(err: DcprError) -> Self {
        let retryable = err.is_transient();
        let details = err.to_string();

        let error = match &err {
            DcprError::SessionNotFound { .. } => Self::not_found("Session not found"),
            DcprError::InvalidRequest(_) => Self::bad_request("Invalid request"),
            DcprError::GenerationFailed { .. } => Self::bad_gateway("Language model request failed"),
            DcprError::EmbedderUnavailable { .. } => Self::bad_gateway("Embedding service unavailable"),
            DcprError::RerankerUnavailable { .. } => Self::bad_gateway("Reranking service unavailable"),
            DcprError::IndexUnavailable { .. } | DcprError::EmbedderMismatch { .. } => {
                Self::unavailable("Regulations index unavailable")
            }
            _ => {
                tracing::error!(error = %err, "Unhandled error");
                Self::internal("Internal error")
            }
        };

        Self { retryable, ..error.with_details(details) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpr_core::error::GenerationStage;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DcprError::SessionNotFound { id: "x".into() }, StatusCode::NOT_FOUND),
            (DcprError::InvalidRequest("turn 0".into()), StatusCode::BAD_REQUEST),
            (
                DcprError::generation(GenerationStage::Answer, "timed out", true),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DcprError::RerankerUnavailable { reason: "down".into(), remediation: "start it".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                DcprError::IndexUnavailable { path: PathBuf::from("idx"), reason: "missing".into() },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DcprError::ConfigMissing { key: "ANTHROPIC_API_KEY".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_transient_failures_are_retryable() {
        let err = ApiError::from(DcprError::generation(GenerationStage::Answer, "timed out", true));
        assert!(err.retryable);
        assert!(err.details.unwrap().contains("timed out"));

        let err = ApiError::from(DcprError::generation(GenerationStage::ConstructQuery, "bad", false));
        assert!(!err.retryable);
    }
}
