//! Service layer: routing, action execution and document lifecycle.

pub mod dispatcher;
pub mod ingest;
pub mod intent_router;
pub mod mailer;
pub mod renderer;
pub mod retrieval;

pub use dispatcher::{ActionDispatcher, ChatReply, ChatRequestContext};
pub use ingest::{DocumentIngestor, IngestOutcome, WindowChunker};
pub use intent_router::{decide_branch, Branch, IntentRouter, RoutingSignals};
pub use mailer::{SendGridConfig, SendGridMailer};
pub use renderer::PrintPdfRenderer;
pub use retrieval::Retriever;
