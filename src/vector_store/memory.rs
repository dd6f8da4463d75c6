//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, rank, CollectionConfig, IndexedSource, SearchResult, StoredChunk,
    VectorStore,
};
use crate::error::{DocragError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory vector store. Chunks are kept in insertion order.
pub struct MemoryVectorStore {
    config: CollectionConfig,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new(config: CollectionConfig) -> Self {
        Self {
            config,
            chunks: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredChunk>>> {
        self.chunks
            .read()
            .map_err(|e| DocragError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn check_dimensions(&self, chunks: &[StoredChunk]) -> Result<()> {
        match chunks
            .iter()
            .find(|c| c.embedding.len() != self.config.dimensions)
        {
            Some(bad) => Err(DocragError::VectorStore(format!(
                "chunk {} has {} dimensions, collection expects {}",
                bad.chunk.id,
                bad.embedding.len(),
                self.config.dimensions
            ))),
            None => Ok(()),
        }
    }

    fn insert_all(stored: &mut Vec<StoredChunk>, chunks: &[StoredChunk]) {
        for chunk in chunks {
            match stored.iter_mut().find(|c| c.chunk.id == chunk.chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => stored.push(chunk.clone()),
            }
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredChunk>>> {
        self.chunks
            .write()
            .map_err(|e| DocragError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<usize> {
        self.check_dimensions(chunks)?;

        let mut stored = self.write()?;
        Self::insert_all(&mut stored, chunks);
        Ok(chunks.len())
    }

    async fn replace_sources(&self, sources: &[String], chunks: &[StoredChunk]) -> Result<usize> {
        self.check_dimensions(chunks)?;

        let mut stored = self.write()?;
        stored.retain(|c| !sources.contains(&c.chunk.metadata.source_file));
        Self::insert_all(&mut stored, chunks);
        Ok(chunks.len())
    }

    async fn similarity_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let stored = self.read()?;

        let mut results: Vec<SearchResult> = stored
            .iter()
            .map(|c| SearchResult {
                chunk: c.chunk.clone(),
                score: cosine_similarity(query_embedding, &c.embedding),
            })
            .filter(|r| r.score >= self.config.min_score)
            .collect();

        rank(&mut results, self.score_kind(), |r| r.score);
        results.truncate(k);
        Ok(results)
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<usize> {
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|c| !ids.contains(&c.chunk.id));
        Ok(before - stored.len())
    }

    async fn delete_by_source(&self, source_file: &str) -> Result<usize> {
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|c| c.chunk.metadata.source_file != source_file);
        Ok(before - stored.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    async fn reset(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let stored = self.read()?;

        let mut order: Vec<String> = Vec::new();
        let mut sources: HashMap<String, (IndexedSource, BTreeSet<u32>)> = HashMap::new();

        for stored_chunk in stored.iter() {
            let meta = &stored_chunk.chunk.metadata;
            let (entry, pages) = sources.entry(meta.source_file.clone()).or_insert_with(|| {
                order.push(meta.source_file.clone());
                (
                    IndexedSource {
                        source_file: meta.source_file.clone(),
                        source_name: meta.source_name.clone(),
                        file_type: meta.file_type.clone(),
                        chunk_count: 0,
                        total_characters: 0,
                        unique_pages: 0,
                        processed_at: meta.processed_at,
                    },
                    BTreeSet::new(),
                )
            });

            entry.chunk_count += 1;
            entry.total_characters += stored_chunk.chunk.text.chars().count();
            if meta.processed_at > entry.processed_at {
                entry.processed_at = meta.processed_at;
            }
            if let Some(page) = meta.page_number {
                pages.insert(page);
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|file| sources.remove(&file))
            .map(|(mut source, pages)| {
                source.unique_pages = pages.len();
                source
            })
            .collect())
    }

    fn collection_name(&self) -> &str {
        &self.config.name
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection_config, stored_chunk};

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new(collection_config(3));

        let first = stored_chunk("guide.pdf", 0, "Hello world", Some(1), vec![1.0, 0.0, 0.0]);
        let second = stored_chunk("guide.pdf", 1, "Goodbye world", Some(2), vec![0.0, 1.0, 0.0]);

        store.upsert(&[first.clone(), second]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        // Upserting the same id replaces instead of duplicating.
        store.upsert(&[first]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.similarity_search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].chunk.text, "Hello world");

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[0].unique_pages, 2);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryVectorStore::new(collection_config(2));
        let a = stored_chunk("a.txt", 0, "same text", None, vec![1.0, 0.0]);
        let b = stored_chunk("b.txt", 0, "same text", None, vec![1.0, 0.0]);
        store.upsert(&[a, b]).await.unwrap();

        let results = store.similarity_search(&[1.0, 0.0], 5).await.unwrap();
        let files: Vec<&str> = results
            .iter()
            .map(|r| r.chunk.metadata.source_file.as_str())
            .collect();
        assert_eq!(files, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_min_score_threshold() {
        let mut config = collection_config(2);
        config.min_score = 0.5;
        let store = MemoryVectorStore::new(config);
        store
            .upsert(&[stored_chunk("a.txt", 0, "orthogonal", None, vec![0.0, 1.0])])
            .await
            .unwrap();

        assert!(store.similarity_search(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimensions() {
        let store = MemoryVectorStore::new(collection_config(3));
        let err = store
            .upsert(&[stored_chunk("a.txt", 0, "text", None, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, DocragError::VectorStore(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_and_reset() {
        let store = MemoryVectorStore::new(collection_config(2));
        let a = stored_chunk("a.txt", 0, "alpha", None, vec![1.0, 0.0]);
        let b = stored_chunk("b.txt", 0, "beta", None, vec![0.0, 1.0]);
        let a_id = a.chunk.id;
        store.upsert(&[a, b]).await.unwrap();

        assert_eq!(store.delete(&[a_id]).await.unwrap(), 1);
        assert_eq!(store.delete_by_source("b.txt").await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);

        store.reset().await.unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_sources_keeps_old_chunks_on_error() {
        let store = MemoryVectorStore::new(collection_config(2));
        let old = stored_chunk("a.txt", 0, "old alpha", None, vec![1.0, 0.0]);
        let other = stored_chunk("b.txt", 0, "beta", None, vec![0.0, 1.0]);
        store.upsert(&[old, other]).await.unwrap();

        let sources = vec!["a.txt".to_string()];
        let broken = stored_chunk("a.txt", 0, "new alpha", None, vec![1.0]);
        assert!(store.replace_sources(&sources, &[broken]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 2);

        let fresh = stored_chunk("a.txt", 0, "new alpha", None, vec![1.0, 0.0]);
        assert_eq!(store.replace_sources(&sources, &[fresh]).await.unwrap(), 1);

        let texts: Vec<String> = store
            .similarity_search(&[1.0, 0.0], 5)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.chunk.text)
            .collect();
        assert_eq!(texts, vec!["new alpha", "beta"]);
    }
}
