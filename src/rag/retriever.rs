//! Query-time retrieval of relevant chunks.

use super::{with_timeout, Retrieval, RetrievedChunk};
use crate::embedding::{validate_embedding, Embedder};
use crate::error::{DocragError, Result};
use crate::vector_store::{rank, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Embeds a query and finds the nearest chunks in the store.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    timeout_seconds: u64,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            timeout_seconds: 60,
        }
    }

    /// Set the limit applied to the embedding and search calls.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Retrieve the `k` most relevant chunks for `query`.
    ///
    /// Embedding and store failures come back as [`DocragError::Retrieval`];
    /// `k == 0` is a configuration error.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Retrieval> {
        if k == 0 {
            return Err(DocragError::Config("top_k must be at least 1".to_string()));
        }

        let embedding = with_timeout(self.timeout_seconds, self.embedder.embed(query))
            .await
            .map_err(|e| match e {
                DocragError::Timeout(_) => e,
                other => DocragError::Retrieval(format!("query embedding failed: {}", other)),
            })?;

        validate_embedding(&embedding, self.embedder.dimensions())
            .map_err(|e| DocragError::Retrieval(format!("unusable query embedding: {}", e)))?;

        let results = with_timeout(
            self.timeout_seconds,
            self.vector_store.similarity_search(&embedding, k),
        )
        .await
        .map_err(|e| match e {
            DocragError::Timeout(_) => e,
            other => DocragError::Retrieval(format!("similarity search failed: {}", other)),
        })?;

        if results.is_empty() {
            info!("No chunks matched the query");
            return Ok(Retrieval::Empty);
        }

        let mut chunks: Vec<RetrievedChunk> = results.into_iter().map(RetrievedChunk::from).collect();

        let kind = self.vector_store.score_kind();
        let ordered = chunks
            .windows(2)
            .all(|pair| kind.ranks_before(pair[0].score, pair[1].score));
        if !ordered {
            debug!("Store returned unordered results, reranking");
            rank(&mut chunks, kind, |c| c.score);
        }
        chunks.truncate(k);

        info!(
            "Retrieved {} chunks (best score {:.3})",
            chunks.len(),
            chunks[0].score
        );
        Ok(Retrieval::Found(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection_config, stored_chunk, FailingEmbedder, KeywordEmbedder};
    use crate::vector_store::{
        IndexedSource, MemoryVectorStore, ScoreKind, SearchResult, StoredChunk,
    };
    use async_trait::async_trait;
    use uuid::Uuid;

    async fn populated_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new(collection_config(5)));
        let texts = [
            ("paris.pdf", "Paris is the capital of France. Paris has museums."),
            ("rome.pdf", "Rome was not built in a day."),
            ("tokyo.pdf", "Tokyo is a large city."),
        ];
        let chunks: Vec<_> = texts
            .iter()
            .map(|(file, text)| stored_chunk(file, 0, text, Some(1), KeywordEmbedder::vector(text)))
            .collect();
        store.upsert(&chunks).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_ranks_best_first() {
        let retriever = Retriever::new(populated_store().await, Arc::new(KeywordEmbedder::default()));

        let Retrieval::Found(chunks) = retriever.search("Tell me about Paris", 2).await.unwrap() else {
            panic!("expected matches");
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk.metadata.source_file, "paris.pdf");
        assert!(chunks[0].score >= chunks[1].score);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty() {
        let store = Arc::new(MemoryVectorStore::new(collection_config(5)));
        let retriever = Retriever::new(store, Arc::new(KeywordEmbedder::default()));
        assert_eq!(retriever.search("anything", 3).await.unwrap(), Retrieval::Empty);
    }

    #[tokio::test]
    async fn test_zero_k_is_config_error() {
        let retriever = Retriever::new(populated_store().await, Arc::new(KeywordEmbedder::default()));
        assert!(retriever.search("paris", 0).await.unwrap_err().is_config());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_error() {
        let retriever = Retriever::new(populated_store().await, Arc::new(FailingEmbedder));
        let err = retriever.search("paris", 3).await.unwrap_err();
        assert!(matches!(err, DocragError::Retrieval(_)));
    }

    /// Returns its chunks in reverse order under a distance score.
    struct ReversedDistanceStore {
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl VectorStore for ReversedDistanceStore {
        async fn upsert(&self, chunks: &[StoredChunk]) -> Result<usize> {
            Ok(chunks.len())
        }
        async fn similarity_search(&self, _query: &[f32], _k: usize) -> Result<Vec<SearchResult>> {
            Ok(self.results.clone())
        }
        async fn delete(&self, _ids: &[Uuid]) -> Result<usize> {
            Ok(0)
        }
        async fn delete_by_source(&self, _source_file: &str) -> Result<usize> {
            Ok(0)
        }
        async fn replace_sources(&self, _sources: &[String], chunks: &[StoredChunk]) -> Result<usize> {
            Ok(chunks.len())
        }
        async fn count(&self) -> Result<usize> {
            Ok(self.results.len())
        }
        async fn reset(&self) -> Result<()> {
            Ok(())
        }
        async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
            Ok(Vec::new())
        }
        fn collection_name(&self) -> &str {
            "reversed"
        }
        fn location(&self) -> String {
            "test".to_string()
        }
        fn score_kind(&self) -> ScoreKind {
            ScoreKind::Distance
        }
    }

    #[tokio::test]
    async fn test_distance_scores_are_reordered() {
        let result = |file: &str, score: f32| SearchResult {
            chunk: stored_chunk(file, 0, file, None, vec![1.0]).chunk,
            score,
        };
        let store = Arc::new(ReversedDistanceStore {
            results: vec![result("far", 0.9), result("near", 0.1), result("tied", 0.1)],
        });
        let retriever = Retriever::new(store, Arc::new(KeywordEmbedder::default()));

        let Retrieval::Found(chunks) = retriever.search("query", 3).await.unwrap() else {
            panic!("expected matches");
        };
        let files: Vec<&str> = chunks
            .iter()
            .map(|c| c.chunk.metadata.source_file.as_str())
            .collect();
        assert_eq!(files, vec!["near", "tied", "far"]);
    }
}
