//! Vector store abstraction for docrag.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::DocumentChunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk together with its embedding, ready to be persisted.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: DocumentChunk,
    /// Score under the store's [`ScoreKind`].
    pub score: f32,
}

/// How a store's scores rank matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    /// Higher is closer (e.g. cosine similarity).
    Similarity,
    /// Lower is closer (e.g. L2 distance).
    Distance,
}

impl ScoreKind {
    /// Whether `a` ranks at least as well as `b`.
    pub fn ranks_before(&self, a: f32, b: f32) -> bool {
        match self {
            ScoreKind::Similarity => a >= b,
            ScoreKind::Distance => a <= b,
        }
    }

    /// Ordering that puts the best score first.
    pub fn compare(&self, a: f32, b: f32) -> std::cmp::Ordering {
        let ordering = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
        match self {
            ScoreKind::Similarity => ordering.reverse(),
            ScoreKind::Distance => ordering,
        }
    }
}

/// Fixed configuration of a collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Collection name.
    pub name: String,
    /// Embedding model the vectors were produced with.
    pub embedding_model: String,
    /// Expected vector length.
    pub dimensions: usize,
    /// Matches scoring below this are not returned.
    pub min_score: f32,
}

/// Summary information about an indexed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    pub source_file: String,
    pub source_name: String,
    pub file_type: String,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Characters across all stored chunks.
    pub total_characters: usize,
    /// Distinct pages referenced by the chunks.
    pub unique_pages: usize,
    /// Most recent processing time.
    pub processed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks. All chunks are written or none are.
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<usize>;

    /// Ranked nearest neighbours of a query vector, best first.
    async fn similarity_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Delete chunks by id.
    async fn delete(&self, ids: &[Uuid]) -> Result<usize>;

    /// Delete all chunks cut from a source file.
    async fn delete_by_source(&self, source_file: &str) -> Result<usize>;

    /// Swap every chunk of `sources` for `chunks` in one step. On error the
    /// previous chunks of those sources are left in place.
    async fn replace_sources(&self, sources: &[String], chunks: &[StoredChunk]) -> Result<usize>;

    /// Number of stored chunks.
    async fn count(&self) -> Result<usize>;

    /// Drop the collection and recreate it empty with the same configuration.
    async fn reset(&self) -> Result<()>;

    /// Per-source summaries.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Collection name.
    fn collection_name(&self) -> &str;

    /// Where the collection lives (file path or endpoint).
    fn location(&self) -> String;

    /// Score semantic of [`VectorStore::similarity_search`].
    fn score_kind(&self) -> ScoreKind {
        ScoreKind::Similarity
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank scored items best first, keeping insertion order on ties.
pub(crate) fn rank<T>(items: &mut [T], kind: ScoreKind, score: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| kind.compare(score(a), score(b)));
}
