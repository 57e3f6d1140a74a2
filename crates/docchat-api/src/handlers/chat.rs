//! Chat endpoint: route the message to one action and run it.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use docchat_core::defaults::MAX_TOP_K;
use docchat_core::ConversationTurn;

use crate::services::{ChatReply, ChatRequestContext};
use crate::{ApiError, AppState};

/// Request body for `POST /api/chat`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    /// Restrict retrieval to one uploaded document key
    #[serde(default)]
    pub file_filter: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Response envelope for `POST /api/chat`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub data: ChatReply,
}

/// Answer a chat message, or perform the PDF/email action it asks for.
///
/// # Returns
/// - 200 OK with the reply; upstream failures are reported in the message
/// - 400 Bad Request if the message is empty
/// - 500 Internal Server Error on internal failures
#[utoipa::path(post, path = "/api/chat", tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Empty message")
    ))]
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
    }

    let top_k = request
        .top_k
        .unwrap_or(state.config.default_top_k)
        .clamp(1, MAX_TOP_K);
    let file_filter = request
        .file_filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    let history = request.conversation_history.as_slice();

    let action = state.router.route(message, history).await;
    let ctx = ChatRequestContext {
        message,
        history,
        file_filter,
        top_k,
    };
    let reply = state.dispatcher.dispatch(&action, &ctx).await?;

    Ok(Json(ChatResponse {
        success: true,
        data: reply,
    }))
}
