//! Document chunking for embedding and retrieval.
//!
//! Splits loaded pages into overlapping, size-bounded chunks and attaches the
//! metadata every downstream component relies on.

mod recursive;

pub use recursive::{RecursiveSplitter, Segment};

use crate::error::Result;
use crate::loader::{FileType, LoadedPage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Metadata attached to every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Path of the file the chunk was cut from.
    pub source_file: String,
    /// Display label, usually the file name.
    pub source_name: String,
    /// Document type label (pdf, txt, md).
    pub file_type: String,
    /// Position of this chunk in its document.
    pub chunk_index: usize,
    /// Number of chunks the document produced.
    pub total_chunks: usize,
    /// Page the chunk is attributed to, if the format has pages.
    pub page_number: Option<u32>,
    /// When the document was chunked.
    pub processed_at: DateTime<Utc>,
    /// Size of the source file in bytes.
    pub file_size_bytes: u64,
}

/// A bounded segment of a source document; the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable identifier, unique within a collection.
    pub id: Uuid,
    /// Chunk text.
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Derive a deterministic id from the chunk's source, position and full text.
    pub fn derive_id(source_file: &str, chunk_index: usize, text: &str) -> Uuid {
        let key = format!("{}\u{0}{}\u{0}{}", source_file, chunk_index, text);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }
}

/// Describes the file a set of pages came from.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub source_file: String,
    pub source_name: String,
    pub file_type: FileType,
    pub file_size_bytes: u64,
}

impl DocumentSource {
    /// Build a source descriptor from a path, using the file name as display label.
    pub fn from_path(path: &Path, file_type: FileType, file_size_bytes: u64) -> Self {
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            source_file: path.display().to_string(),
            source_name,
            file_type,
            file_size_bytes,
        }
    }
}

/// Split a document's pages into chunks with metadata.
///
/// Fails with a configuration error unless `0 < overlap < chunk_size`.
pub fn split_document(
    pages: &[LoadedPage],
    source: &DocumentSource,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<DocumentChunk>> {
    let splitter = RecursiveSplitter::new(chunk_size, overlap)?;
    let segments = splitter.split(pages);
    let total_chunks = segments.len();
    let processed_at = Utc::now();

    Ok(segments
        .into_iter()
        .enumerate()
        .map(|(chunk_index, segment)| DocumentChunk {
            id: DocumentChunk::derive_id(&source.source_file, chunk_index, &segment.text),
            text: segment.text,
            metadata: ChunkMetadata {
                source_file: source.source_file.clone(),
                source_name: source.source_name.clone(),
                file_type: source.file_type.as_str().to_string(),
                chunk_index,
                total_chunks,
                page_number: segment.page_number,
                processed_at,
                file_size_bytes: source.file_size_bytes,
            },
        })
        .collect())
}
