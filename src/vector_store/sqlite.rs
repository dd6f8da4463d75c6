//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! Each collection is a row in `collections`; its chunks live in `chunks`.

use super::{
    cosine_similarity, rank, CollectionConfig, IndexedSource, SearchResult, StoredChunk,
    VectorStore,
};
use crate::chunking::{ChunkMetadata, DocumentChunk};
use crate::error::{DocragError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    embedding_model TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    source_file TEXT NOT NULL,
    source_name TEXT NOT NULL,
    file_type TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    total_chunks INTEGER NOT NULL,
    page_number INTEGER,
    processed_at TEXT NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source_file);
"#;

const CHUNK_COLUMNS: &str = "id, text, embedding, source_file, source_name, file_type, \
     chunk_index, total_chunks, page_number, processed_at, file_size_bytes";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    config: CollectionConfig,
    location: String,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path` and make sure the collection exists.
    #[instrument(skip_all, fields(collection = %config.name))]
    pub fn new(path: &Path, config: CollectionConfig) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self::with_connection(conn, config, path.to_path_buf())?;
        info!("Initialized SQLite vector store at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(config: CollectionConfig) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, config, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, config: CollectionConfig, path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        let existing: Option<(String, i64)> = conn
            .query_row(
                "SELECT embedding_model, dimensions FROM collections WHERE name = ?1",
                params![config.name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((_, dimensions)) if dimensions as usize != config.dimensions => {
                return Err(DocragError::Config(format!(
                    "collection '{}' was created with {} dimensions but {} are configured; \
                     clear the database or change embedding.dimensions",
                    config.name, dimensions, config.dimensions
                )));
            }
            Some((model, _)) if model != config.embedding_model => {
                warn!(
                    "Collection '{}' was built with {}, now using {}",
                    config.name, model, config.embedding_model
                );
            }
            Some(_) => {}
            None => Self::create_collection(&conn, &config)?,
        }

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            location: path.display().to_string(),
        })
    }

    fn create_collection(conn: &Connection, config: &CollectionConfig) -> Result<()> {
        conn.execute(
            "INSERT INTO collections (name, embedding_model, dimensions, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                config.name,
                config.embedding_model,
                config.dimensions as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocragError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
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

    fn insert_chunk(&self, conn: &Connection, stored: &StoredChunk) -> Result<()> {
        let chunk = &stored.chunk;
        let meta = &chunk.metadata;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO chunks (collection, {}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                CHUNK_COLUMNS
            ),
            params![
                self.config.name,
                chunk.id.to_string(),
                chunk.text,
                Self::embedding_to_bytes(&stored.embedding),
                meta.source_file,
                meta.source_name,
                meta.file_type,
                meta.chunk_index as i64,
                meta.total_chunks as i64,
                meta.page_number.map(i64::from),
                meta.processed_at.to_rfc3339(),
                meta.file_size_bytes as i64,
            ],
        )?;
        Ok(())
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<(DocumentChunk, Vec<f32>)> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(2)?;
        let chunk_index: i64 = row.get(6)?;
        let total_chunks: i64 = row.get(7)?;
        let page_number: Option<i64> = row.get(8)?;
        let processed_at: String = row.get(9)?;
        let file_size_bytes: i64 = row.get(10)?;

        let chunk = DocumentChunk {
            id: Uuid::parse_str(&id_str).unwrap_or_default(),
            text: row.get(1)?,
            metadata: ChunkMetadata {
                source_file: row.get(3)?,
                source_name: row.get(4)?,
                file_type: row.get(5)?,
                chunk_index: chunk_index as usize,
                total_chunks: total_chunks as usize,
                page_number: page_number.map(|p| p as u32),
                processed_at: Self::parse_timestamp(&processed_at),
                file_size_bytes: file_size_bytes as u64,
            },
        };

        Ok((chunk, Self::bytes_to_embedding(&embedding_bytes)))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn upsert(&self, chunks: &[StoredChunk]) -> Result<usize> {
        self.check_dimensions(chunks)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for stored in chunks {
            self.insert_chunk(&tx, stored)?;
        }
        tx.commit()?;

        info!("Batch upserted {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, sources, chunks), fields(sources = sources.len(), count = chunks.len()))]
    async fn replace_sources(&self, sources: &[String], chunks: &[StoredChunk]) -> Result<usize> {
        self.check_dimensions(chunks)?;

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for source_file in sources {
            tx.execute(
                "DELETE FROM chunks WHERE collection = ?1 AND source_file = ?2",
                params![self.config.name, source_file],
            )?;
        }
        for stored in chunks {
            self.insert_chunk(&tx, stored)?;
        }
        tx.commit()?;

        info!("Replaced {} sources with {} chunks", sources.len(), chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn similarity_search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chunks WHERE collection = ?1 ORDER BY rowid",
            CHUNK_COLUMNS
        ))?;

        let rows = stmt.query_map(params![self.config.name], Self::row_to_chunk)?;

        let mut results: Vec<SearchResult> = rows
            .filter_map(|row| row.ok())
            .map(|(chunk, embedding)| SearchResult {
                score: cosine_similarity(query_embedding, &embedding),
                chunk,
            })
            .filter(|r| r.score >= self.config.min_score)
            .collect();

        rank(&mut results, self.score_kind(), |r| r.score);
        results.truncate(k);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete(&self, ids: &[Uuid]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut deleted = 0;
        for id in ids {
            deleted += tx.execute(
                "DELETE FROM chunks WHERE collection = ?1 AND id = ?2",
                params![self.config.name, id.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source_file: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM chunks WHERE collection = ?1 AND source_file = ?2",
            params![self.config.name, source_file],
        )?;

        if deleted > 0 {
            info!("Deleted {} chunks for {}", deleted, source_file);
        }
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.config.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self), fields(collection = %self.config.name))]
    async fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM chunks WHERE collection = ?1", params![self.config.name])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![self.config.name])?;
        Self::create_collection(&tx, &self.config)?;

        tx.commit()?;
        info!("Reset collection {}", self.config.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source_file, MIN(source_name), MIN(file_type), COUNT(*),
                   SUM(LENGTH(text)), COUNT(DISTINCT page_number), MAX(processed_at)
            FROM chunks
            WHERE collection = ?1
            GROUP BY source_file
            ORDER BY MIN(rowid)
            "#,
        )?;

        let sources = stmt.query_map(params![self.config.name], |row| {
            let chunk_count: i64 = row.get(3)?;
            let total_characters: i64 = row.get(4)?;
            let unique_pages: i64 = row.get(5)?;
            let processed_at: String = row.get(6)?;

            Ok(IndexedSource {
                source_file: row.get(0)?,
                source_name: row.get(1)?,
                file_type: row.get(2)?,
                chunk_count: chunk_count as usize,
                total_characters: total_characters as usize,
                unique_pages: unique_pages as usize,
                processed_at: Self::parse_timestamp(&processed_at),
            })
        })?;

        Ok(sources.filter_map(|s| s.ok()).collect())
    }

    fn collection_name(&self) -> &str {
        &self.config.name
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
