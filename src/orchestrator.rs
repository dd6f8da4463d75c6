//! Pipeline orchestrator for docrag.
//!
//! Wires the configured collaborators together and exposes the indexing and
//! question answering entry points used by the CLI and HTTP server.

use crate::config::{Settings, VectorStoreProvider};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DocragError, Result};
use crate::generation::{Generator, OpenAIGenerator};
use crate::indexer::{CollectionStats, DatabaseInfo, Indexer, IndexerOptions, IndexingResult};
use crate::rag::{AnswerEngine, ConversationState, EngineOptions, RagResult, SessionMemory};
use crate::vector_store::{CollectionConfig, MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the docrag pipeline.
pub struct Orchestrator {
    settings: Settings,
    vector_store: Arc<dyn VectorStore>,
    indexer: Indexer,
    engine: AnswerEngine,
    memory: SessionMemory,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI and the configured vector store.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::new(&settings.openai, &settings.embedding)?);
        let generator: Arc<dyn Generator> =
            Arc::new(OpenAIGenerator::new(&settings.openai, &settings.generation)?);

        let collection = CollectionConfig {
            name: settings.vector_store.collection_name.clone(),
            embedding_model: settings.embedding.model.clone(),
            dimensions: settings.embedding.dimensions as usize,
            min_score: settings.vector_store.min_score,
        };

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider {
            VectorStoreProvider::Sqlite => {
                Arc::new(SqliteVectorStore::new(&settings.sqlite_path(), collection)?)
            }
            VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new(collection)),
        };

        info!(
            "Using {} vector store at {} (collection {})",
            settings.vector_store.provider,
            vector_store.location(),
            vector_store.collection_name()
        );

        Ok(Self::with_components(settings, vector_store, embedder, generator))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let indexer = Indexer::new(
            vector_store.clone(),
            embedder.clone(),
            IndexerOptions::from_settings(&settings),
        );
        let engine = AnswerEngine::new(
            vector_store.clone(),
            embedder,
            generator,
            EngineOptions::from_settings(&settings),
        );
        let memory = SessionMemory::new(settings.memory.max_turns, settings.memory.max_sessions);

        Self {
            settings,
            vector_store,
            indexer,
            engine,
            memory,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Index the given files.
    pub async fn index_files(&self, paths: &[PathBuf]) -> Result<IndexingResult> {
        self.indexer.index_files(paths).await
    }

    /// Index every supported file in a directory.
    pub async fn index_directory(&self, dir: &Path) -> Result<IndexingResult> {
        self.indexer.index_directory(dir).await
    }

    /// Answer a standalone question.
    #[instrument(skip(self))]
    pub async fn ask(&self, query: &str, verbose: bool, top_k: Option<usize>) -> Result<RagResult> {
        let result = self.engine.ask(query, None, top_k).await?;
        log_sources(&result, verbose);
        Ok(result)
    }

    /// Answer a question as part of a caller-held conversation.
    pub async fn ask_with_history(
        &self,
        query: &str,
        history: &mut ConversationState,
        top_k: Option<usize>,
    ) -> Result<RagResult> {
        self.engine.ask(query, Some(history), top_k).await
    }

    /// Answer a question within a server-side session.
    ///
    /// History is used when memory is enabled for the session, either through
    /// [`Orchestrator::set_memory`] or the `memory.enabled` setting.
    #[instrument(skip(self))]
    pub async fn ask_in_session(
        &self,
        session_id: &str,
        query: &str,
        verbose: bool,
        top_k: Option<usize>,
    ) -> Result<RagResult> {
        let result = if self.memory_enabled(session_id).await {
            let session = self.memory.session(session_id).await;
            let mut history = session.lock().await;
            self.engine.ask(query, Some(&mut *history), top_k).await?
        } else {
            self.engine.ask(query, None, top_k).await?
        };

        log_sources(&result, verbose);
        Ok(result)
    }

    /// Turn memory on or off for a session. Disabling forgets its history.
    pub async fn set_memory(&self, session_id: &str, enable: bool) {
        self.memory
            .set_enabled(session_id, enable, self.settings.memory.enabled)
            .await;
        info!(
            "Memory {} for session {}",
            if enable { "enabled" } else { "disabled" },
            session_id
        );
    }

    /// Whether a session's questions are answered with history.
    pub async fn memory_enabled(&self, session_id: &str) -> bool {
        self.memory
            .enabled(session_id)
            .await
            .unwrap_or(self.settings.memory.enabled)
    }

    /// Forget a session's history without changing its memory setting.
    pub async fn clear_session(&self, session_id: &str) {
        self.memory.clear(session_id).await;
    }

    /// Delete every indexed chunk. Requires explicit confirmation.
    pub async fn clear_database(&self, confirm: bool) -> Result<()> {
        if !confirm {
            return Err(DocragError::InvalidInput(
                "clearing the database requires confirmation".to_string(),
            ));
        }
        self.indexer.clear().await
    }

    /// Describe the collection.
    pub async fn database_info(&self) -> Result<DatabaseInfo> {
        self.indexer.info().await
    }

    /// Per-source statistics.
    pub async fn stats(&self) -> Result<CollectionStats> {
        self.indexer.stats().await
    }
}

fn log_sources(result: &RagResult, verbose: bool) {
    if !verbose {
        return;
    }
    for (i, source) in result.sources().iter().enumerate() {
        info!(
            "Source {}: {} (page {}, score {:.3})",
            i + 1,
            source.title,
            source.page,
            source.score
        );
    }
}
