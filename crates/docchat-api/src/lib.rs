//! # docchat-api
//!
//! HTTP surface for docchat: chat with uploaded PDFs, generate reports and
//! email documents.
//!
//! The binary in `main.rs` wires real collaborators (OpenAI, Pinecone,
//! SendGrid, the filesystem store) into [`AppState`] and serves [`app`].
//! Tests build the same router around mocks.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, Request},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::{AppState, Collaborators};

use handlers::{chat, health, pdfs, rag};

/// Request ID generator using UUIDv7 (time-ordered).
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "docchat API",
        description = "Chat with uploaded PDFs, generate reports and email documents"
    ),
    paths(
        health::root,
        health::health_check,
        chat::chat,
        pdfs::upload,
        pdfs::list,
        pdfs::delete,
        pdfs::view,
        rag::query,
    ),
    components(schemas(
        chat::ChatRequest,
        chat::ChatResponse,
        services::ChatReply,
        docchat_core::ConversationTurn,
        docchat_core::Role,
        docchat_core::SourceRef,
        docchat_core::StoredObject,
        pdfs::UploadResponse,
        pdfs::UploadedDocument,
        pdfs::ListResponse,
        pdfs::DeleteResponse,
        rag::RagHit,
        rag::RagQueryResponse,
    )),
    tags(
        (name = "Chat", description = "Conversational answers and actions"),
        (name = "Documents", description = "PDF upload, listing and viewing"),
        (name = "Retrieval", description = "Raw vector retrieval"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Build the router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let allowed_origins = state.config.allowed_origins.clone();
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/openapi.json", get(openapi_json))
        .route("/api/chat", post(chat::chat))
        .route("/api/pdfs", get(pdfs::list).delete(pdfs::delete))
        .route("/api/pdfs/upload", post(pdfs::upload))
        .route("/api/pdfs/view/*key", get(pdfs::view))
        .route("/api/rag/query", post(rag::query))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
