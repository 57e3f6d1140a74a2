//! Shared application state.

use std::sync::Arc;

use docchat_core::{EmbeddingBackend, GenerationBackend, Mailer, ObjectStore, PdfRenderer, VectorIndex};
use docchat_inference::IntentClassifiers;

use crate::config::AppConfig;
use crate::services::{ActionDispatcher, DocumentIngestor, IntentRouter, Retriever};

/// External collaborators the services are built from.
pub struct Collaborators {
    pub embeddings: Arc<dyn EmbeddingBackend>,
    pub generator: Arc<dyn GenerationBackend>,
    pub index: Arc<dyn VectorIndex>,
    pub store: Arc<dyn ObjectStore>,
    /// `None` when email delivery is not configured
    pub mailer: Option<Arc<dyn Mailer>>,
    pub renderer: Arc<dyn PdfRenderer>,
}

/// Handles every request shares. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub router: Arc<IntentRouter>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub ingestor: Arc<DocumentIngestor>,
    pub retriever: Arc<Retriever>,
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(config: AppConfig, collab: Collaborators) -> Self {
        let classifiers = IntentClassifiers::from_backend(collab.generator.clone());
        Self::with_classifiers(config, collab, classifiers)
    }

    /// Build with an explicit classifier set.
    pub fn with_classifiers(
        config: AppConfig,
        collab: Collaborators,
        classifiers: IntentClassifiers,
    ) -> Self {
        let retriever = Arc::new(Retriever::new(
            collab.embeddings.clone(),
            collab.index.clone(),
        ));
        let dispatcher = ActionDispatcher::new(
            retriever.clone(),
            collab.generator,
            collab.store.clone(),
            collab.mailer,
            collab.renderer,
        )
        .with_backend_url(config.backend_url.clone())
        .with_assistant_name(config.assistant_name.clone());
        let ingestor = DocumentIngestor::new(collab.embeddings, collab.index, collab.store.clone());

        Self {
            config: Arc::new(config),
            router: Arc::new(IntentRouter::new(classifiers)),
            dispatcher: Arc::new(dispatcher),
            ingestor: Arc::new(ingestor),
            retriever,
            store: collab.store,
        }
    }
}
