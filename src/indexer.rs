//! Document indexing: validate, load, chunk, embed and upsert.
//!
//! Also owns the collection lifecycle (clear, info, stats).

use crate::chunking::{split_document, DocumentChunk, DocumentSource};
use crate::config::Settings;
use crate::embedding::{validate_embedding, Embedder};
use crate::error::{DocragError, Result};
use crate::loader::{loader_for, FileType};
use crate::rag::with_timeout;
use crate::vector_store::{IndexedSource, StoredChunk, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Outcome of an indexing run.
///
/// `chunks_indexed` never exceeds `chunks_created`, and is zero whenever
/// `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingResult {
    success: bool,
    message: String,
    files_processed: usize,
    files_skipped: usize,
    chunks_created: usize,
    chunks_indexed: usize,
}

impl IndexingResult {
    /// A successful run.
    pub fn indexed(
        files_processed: usize,
        files_skipped: usize,
        chunks_created: usize,
        chunks_indexed: usize,
    ) -> Self {
        let chunks_indexed = chunks_indexed.min(chunks_created);
        Self {
            success: true,
            message: format!(
                "Indexed {} chunks from {} file(s)",
                chunks_indexed, files_processed
            ),
            files_processed,
            files_skipped,
            chunks_created,
            chunks_indexed,
        }
    }

    /// A run that stored nothing.
    pub fn failed(
        message: impl Into<String>,
        files_processed: usize,
        files_skipped: usize,
        chunks_created: usize,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            files_processed,
            files_skipped,
            chunks_created,
            chunks_indexed: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn files_processed(&self) -> usize {
        self.files_processed
    }

    pub fn files_skipped(&self) -> usize {
        self.files_skipped
    }

    pub fn chunks_created(&self) -> usize {
        self.chunks_created
    }

    pub fn chunks_indexed(&self) -> usize {
        self.chunks_indexed
    }
}

/// Summary of the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    /// Number of stored chunks.
    pub total_documents: usize,
    pub collection_name: String,
    /// Persist path or endpoint.
    pub location: String,
    pub embedding_model: String,
}

/// Per-source statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub source_file: String,
    pub source_name: String,
    pub file_type: String,
    pub chunk_count: usize,
    pub total_characters: usize,
    pub average_chunk_size: f64,
    pub unique_pages: usize,
}

impl From<IndexedSource> for SourceStats {
    fn from(source: IndexedSource) -> Self {
        let average_chunk_size = if source.chunk_count == 0 {
            0.0
        } else {
            source.total_characters as f64 / source.chunk_count as f64
        };

        Self {
            source_file: source.source_file,
            source_name: source.source_name,
            file_type: source.file_type,
            chunk_count: source.chunk_count,
            total_characters: source.total_characters,
            average_chunk_size,
            unique_pages: source.unique_pages,
        }
    }
}

/// Statistics over the whole collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub collection_name: String,
    pub total_chunks: usize,
    pub sources: Vec<SourceStats>,
}

/// Chunking and embedding parameters for an [`Indexer`].
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Texts sent per embedding call.
    pub batch_size: usize,
    /// Limit for each embedding and store call.
    pub timeout_seconds: u64,
}

impl IndexerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
            batch_size: settings.embedding.batch_size,
            timeout_seconds: settings.service.timeout_seconds,
        }
    }
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Writes documents into the vector store.
///
/// Not synchronized against concurrent [`Indexer::clear`]; callers that
/// share an indexer serialize clears themselves.
pub struct Indexer {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    options: IndexerOptions,
}

impl Indexer {
    /// Create a new indexer.
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        options: IndexerOptions,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            options,
        }
    }

    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// Embed and store chunks, returning their ids in input order.
    ///
    /// Either every chunk is stored or none is.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_documents(&self, chunks: Vec<DocumentChunk>) -> Result<Vec<Uuid>> {
        let stored = self.embed_chunks(chunks).await?;
        self.upsert(&stored).await?;
        Ok(stored.iter().map(|s| s.chunk.id).collect())
    }

    /// Delete every stored chunk, leaving an empty collection behind.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        with_timeout(self.options.timeout_seconds, self.vector_store.reset()).await?;
        info!("Cleared collection {}", self.vector_store.collection_name());
        Ok(())
    }

    /// Describe the collection.
    pub async fn info(&self) -> Result<DatabaseInfo> {
        let total_documents =
            with_timeout(self.options.timeout_seconds, self.vector_store.count()).await?;

        Ok(DatabaseInfo {
            total_documents,
            collection_name: self.vector_store.collection_name().to_string(),
            location: self.vector_store.location(),
            embedding_model: self.embedder.model().to_string(),
        })
    }

    /// Per-source statistics.
    pub async fn stats(&self) -> Result<CollectionStats> {
        let sources =
            with_timeout(self.options.timeout_seconds, self.vector_store.list_sources()).await?;

        Ok(CollectionStats {
            collection_name: self.vector_store.collection_name().to_string(),
            total_chunks: sources.iter().map(|s| s.chunk_count).sum(),
            sources: sources.into_iter().map(SourceStats::from).collect(),
        })
    }

    /// Index a set of files.
    ///
    /// Missing, empty, unsupported and unreadable files are skipped. Re-indexing a file
    /// replaces its previous chunks. Only configuration errors are returned as
    /// `Err`; every other failure comes back as an unsuccessful result.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn index_files(&self, paths: &[PathBuf]) -> Result<IndexingResult> {
        let mut skipped = 0;
        let mut valid = Vec::new();

        for path in paths {
            match validate_file(path).await {
                Ok(file) => valid.push(file),
                Err(reason) => {
                    warn!("Skipping {}: {}", path.display(), reason);
                    skipped += 1;
                }
            }
        }

        if valid.is_empty() {
            return Ok(IndexingResult::failed("No valid files to index", 0, skipped, 0));
        }

        let mut processed = 0;
        let mut sources = Vec::new();
        let mut chunks = Vec::new();

        for (path, source) in &valid {
            info!("Processing {}: {}", source.file_type, path.display());

            let pages = match loader_for(source.file_type).load(path).await {
                Ok(pages) => pages,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            if pages.is_empty() {
                warn!("No text extracted from {}", path.display());
                skipped += 1;
                continue;
            }

            let document_chunks = split_document(
                &pages,
                source,
                self.options.chunk_size,
                self.options.chunk_overlap,
            )?;
            info!("Created {} chunks from {}", document_chunks.len(), path.display());

            processed += 1;
            sources.push(source.source_file.clone());
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            return Ok(IndexingResult::failed(
                "No text could be extracted from the given files",
                processed,
                skipped,
                0,
            ));
        }

        let created = chunks.len();

        let stored = match self.embed_chunks(chunks).await {
            Ok(stored) => stored,
            Err(e) => return Ok(IndexingResult::failed(e.to_string(), processed, skipped, created)),
        };

        if let Err(e) = self.replace_sources(&sources, &stored).await {
            return Ok(IndexingResult::failed(e.to_string(), processed, skipped, created));
        }

        let result = IndexingResult::indexed(processed, skipped, created, stored.len());
        info!("{}", result.message());
        Ok(result)
    }

    /// Index every supported file directly inside `dir`, in name order.
    #[instrument(skip(self))]
    pub async fn index_directory(&self, dir: &Path) -> Result<IndexingResult> {
        let paths = match supported_files(dir).await {
            Ok(paths) => paths,
            Err(e) => {
                return Ok(IndexingResult::failed(
                    format!("Cannot read directory {}: {}", dir.display(), e),
                    0,
                    0,
                    0,
                ));
            }
        };

        if paths.is_empty() {
            return Ok(IndexingResult::failed(
                format!("No supported files found in {}", dir.display()),
                0,
                0,
                0,
            ));
        }

        info!("Found {} files in {}", paths.len(), dir.display());
        self.index_files(&paths).await
    }

    async fn embed_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<Vec<StoredChunk>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let dimensions = self.embedder.dimensions();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.options.batch_size.max(1)) {
            let vectors = with_timeout(self.options.timeout_seconds, self.embedder.embed_batch(batch))
                .await
                .map_err(|e| DocragError::Indexing(format!("embedding failed: {}", e)))?;

            if vectors.len() != batch.len() {
                return Err(DocragError::Indexing(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
        }

        chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                validate_embedding(&embedding, dimensions).map_err(|e| {
                    DocragError::Indexing(format!(
                        "chunk {} of {}: {}",
                        chunk.metadata.chunk_index, chunk.metadata.source_file, e
                    ))
                })?;
                Ok(StoredChunk { chunk, embedding })
            })
            .collect()
    }

    async fn upsert(&self, stored: &[StoredChunk]) -> Result<usize> {
        let count = with_timeout(self.options.timeout_seconds, self.vector_store.upsert(stored)).await?;
        debug!("Upserted {} chunks", count);
        Ok(count)
    }

    async fn replace_sources(&self, sources: &[String], stored: &[StoredChunk]) -> Result<usize> {
        let count = with_timeout(
            self.options.timeout_seconds,
            self.vector_store.replace_sources(sources, stored),
        )
        .await?;
        debug!("Replaced {} sources with {} chunks", sources.len(), count);
        Ok(count)
    }
}

/// Check that a path is an existing, non-empty file of a supported type.
async fn validate_file(path: &Path) -> std::result::Result<(PathBuf, DocumentSource), String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| "file does not exist".to_string())?;

    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }

    let file_type = FileType::from_path(path).ok_or_else(|| "unsupported file type".to_string())?;

    if metadata.len() == 0 {
        return Err("file is empty".to_string());
    }

    Ok((
        path.to_path_buf(),
        DocumentSource::from_path(path, file_type, metadata.len()),
    ))
}

async fn supported_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && FileType::from_path(&path).is_some() {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
