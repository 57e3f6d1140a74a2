//! Raw retrieval endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use docchat_core::defaults::MAX_TOP_K;

use crate::{ApiError, AppState};

/// Query parameters for `POST /api/rag/query`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RagQueryParams {
    pub query: String,
    pub top_k: Option<usize>,
    /// Restrict to one uploaded document key
    pub file_name: Option<String>,
}

/// One retrieved chunk.
#[derive(Debug, Serialize, ToSchema)]
pub struct RagHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub file_name: Option<String>,
    pub chunk_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RagQueryResponse {
    pub message: String,
    pub data: Vec<RagHit>,
}

/// Top-k chunks for a query, without generation.
#[utoipa::path(post, path = "/api/rag/query", tag = "Retrieval",
    params(RagQueryParams),
    responses(
        (status = 200, description = "Retrieved chunks", body = RagQueryResponse),
        (status = 400, description = "Empty query")
    ))]
pub async fn query(
    State(state): State<AppState>,
    Query(params): Query<RagQueryParams>,
) -> Result<Json<RagQueryResponse>, ApiError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".to_string()));
    }
    let top_k = params
        .top_k
        .unwrap_or(state.config.default_top_k)
        .clamp(1, MAX_TOP_K);
    let file_name = params.file_name.as_deref().filter(|f| !f.trim().is_empty());

    let matches = state.retriever.retrieve(query, top_k, file_name).await?;
    let data = matches
        .into_iter()
        .map(|m| RagHit {
            file_name: m.file_name().map(str::to_string),
            chunk_id: m.chunk_id(),
            id: m.id,
            score: m.score,
            text: m.text,
        })
        .collect();

    Ok(Json(RagQueryResponse {
        message: "Query completed successfully".to_string(),
        data,
    }))
}
