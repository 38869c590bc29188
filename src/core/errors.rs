use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy for the retrieval pipeline.
///
/// `CorpusFormat` is the only fatal variant: without a well-formed corpus
/// no index can be built and startup aborts. `IndexLoad` triggers a full
/// rebuild. `Retrieval` and `Generation` are absorbed by the query engine
/// into a degraded result, and `Escalation` is absorbed by the gate; none
/// of them ever reach the caller of `query` or `answer`.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("malformed corpus: {0}")]
    CorpusFormat(String),
    #[error("index load failed: {0}")]
    IndexLoad(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("escalation failed: {0}")]
    Escalation(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
