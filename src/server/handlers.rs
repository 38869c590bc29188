use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::escalation::AnswerMethod;
use crate::knowledge::DocMetadata;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub method: AnswerMethod,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub content: String,
    pub metadata: DocMetadata,
    pub score: f32,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Direct retrieval path. Never fails below the HTTP layer: a broken
/// pipeline surfaces as a degraded answer with confidence 0.0.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question cannot be empty".to_string()));
    }

    let result = state.engine.query(&request.question).await;

    Ok(Json(QueryResponse {
        answer: result.answer,
        confidence: result.confidence,
        sources: result.sources,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Gated path: direct when confident, otherwise the agent pipeline with
/// fallback to the direct answer.
pub async fn answer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question cannot be empty".to_string()));
    }

    let result = state.gate.answer(&request.question).await;

    Ok(Json(AnswerResponse {
        answer: result.answer,
        confidence: result.confidence,
        sources: result.sources,
        method: result.method,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Raw vector search with per-hit distances.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Value>, ApiError> {
    let hits = state
        .engine
        .search(&request.query, request.top_k)
        .await
        .map_err(ApiError::internal)?;

    let results: Vec<SearchResult> = hits
        .into_iter()
        .map(|hit| SearchResult {
            content: hit.chunk.text,
            metadata: hit.chunk.metadata,
            score: hit.distance,
        })
        .collect();

    Ok(Json(json!({ "results": results })))
}
