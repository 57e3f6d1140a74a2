//! docchat API server.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docchat_api::services::{PrintPdfRenderer, SendGridMailer};
use docchat_api::{app, AppConfig, AppState, Collaborators};
use docchat_core::{Mailer, VectorIndex};
use docchat_inference::OpenAIBackend;
use docchat_search::{InMemoryVectorIndex, PineconeConfig, PineconeIndex};
use docchat_store::FilesystemStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "docchat_api=debug,docchat_inference=info,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docchat_api=debug,docchat_inference=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("docchat-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = AppConfig::from_env();

    // Model backend serves both embeddings and completions
    let backend = Arc::new(OpenAIBackend::from_env()?);
    info!(
        embedding_model = %docchat_core::EmbeddingBackend::model_name(backend.as_ref()),
        generation_model = %docchat_core::GenerationBackend::model_name(backend.as_ref()),
        "Model backend configured"
    );

    let index: Arc<dyn VectorIndex> = match PineconeConfig::from_env() {
        Some(cfg) => {
            info!(index_host = %cfg.index_host, "Using Pinecone vector index");
            Arc::new(PineconeIndex::new(cfg)?)
        }
        None => {
            warn!("PINECONE_API_KEY or PINECONE_INDEX_HOST not set; using in-memory vector index (not persisted)");
            Arc::new(InMemoryVectorIndex::new())
        }
    };

    let store = FilesystemStore::new(config.storage_path.clone());
    if let Err(e) = store.validate().await {
        anyhow::bail!(
            "Storage path {} is not usable: {}",
            config.storage_path.display(),
            e
        );
    }
    info!(storage_path = %config.storage_path.display(), "Object store ready");

    let mailer: Option<Arc<dyn Mailer>> = match SendGridMailer::from_env()? {
        Some(m) => {
            info!("SendGrid email delivery enabled");
            Some(Arc::new(m))
        }
        None => {
            warn!("SENDGRID_API_KEY or SENDGRID_FROM_EMAIL not set; email actions disabled");
            None
        }
    };

    let collaborators = Collaborators {
        embeddings: backend.clone(),
        generator: backend,
        index,
        store: Arc::new(store),
        mailer,
        renderer: Arc::new(PrintPdfRenderer::new()),
    };

    let addr: SocketAddr = config.bind_address().parse()?;
    let state = AppState::new(config, collaborators);
    let app = app(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
