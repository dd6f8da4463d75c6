//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the ability to ask questions and get grounded answers from the
//! indexed document collection.

pub mod context;
mod engine;
mod memory;
mod response;
mod retriever;

pub use context::ContextAssembler;
pub use engine::{AnswerEngine, EngineOptions};
pub use memory::{ConversationState, ConversationTurn, Role, SessionMemory};
pub use response::{Page, RagResult, ResponseFormatter, Source, NO_INFORMATION_ANSWER};
pub use retriever::Retriever;

use crate::chunking::DocumentChunk;
use crate::error::{DocragError, Result};
use crate::vector_store::SearchResult;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

/// A chunk returned by retrieval together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    /// Score under the store's score kind.
    pub score: f32,
}

impl From<SearchResult> for RetrievedChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            chunk: result.chunk,
            score: result.score,
        }
    }
}

/// Outcome of a retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// At least one chunk matched, best first.
    Found(Vec<RetrievedChunk>),
    /// The store is empty or nothing passed its threshold.
    Empty,
}

impl Retrieval {
    pub fn len(&self) -> usize {
        match self {
            Retrieval::Found(chunks) => chunks.len(),
            Retrieval::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chunks with distinct text in retrieval order, first occurrence kept.
///
/// Prompt documents and result sources are both numbered over this sequence,
/// so "Document N" in an answer is the N-th source.
pub(crate) fn distinct_chunks<'a>(
    chunks: &'a [RetrievedChunk],
) -> impl Iterator<Item = &'a RetrievedChunk> + 'a {
    let mut seen = HashSet::new();
    chunks.iter().filter(move |c| seen.insert(c.chunk.text.as_str()))
}

/// Await `future`, failing with [`DocragError::Timeout`] after `seconds`.
pub(crate) async fn with_timeout<T>(seconds: u64, future: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(Duration::from_secs(seconds), future).await {
        Ok(result) => result,
        Err(_) => Err(DocragError::Timeout(seconds)),
    }
}
