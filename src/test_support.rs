//! Fakes and fixtures shared by unit tests.

use crate::chunking::{ChunkMetadata, DocumentChunk};
use crate::embedding::Embedder;
use crate::error::{DocragError, Result};
use crate::generation::Generator;
use crate::vector_store::{CollectionConfig, StoredChunk};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const VOCABULARY: [&str; 4] = ["paris", "rome", "tokyo", "visa"];

pub fn collection_config(dimensions: usize) -> CollectionConfig {
    CollectionConfig {
        name: "test_documents".to_string(),
        embedding_model: "keyword-test".to_string(),
        dimensions,
        min_score: 0.0,
    }
}

pub fn chunk(source_file: &str, chunk_index: usize, text: &str, page_number: Option<u32>) -> DocumentChunk {
    let source_name = Path::new(source_file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    DocumentChunk {
        id: DocumentChunk::derive_id(source_file, chunk_index, text),
        text: text.to_string(),
        metadata: ChunkMetadata {
            source_file: source_file.to_string(),
            source_name,
            file_type: "pdf".to_string(),
            chunk_index,
            total_chunks: chunk_index + 1,
            page_number,
            processed_at: Utc::now(),
            file_size_bytes: text.len() as u64,
        },
    }
}

pub fn stored_chunk(
    source_file: &str,
    chunk_index: usize,
    text: &str,
    page_number: Option<u32>,
    embedding: Vec<f32>,
) -> StoredChunk {
    StoredChunk {
        chunk: chunk(source_file, chunk_index, text, page_number),
        embedding,
    }
}

/// Embeds text as keyword counts over [`VOCABULARY`] plus a constant bias term,
/// so every vector is non-zero and texts sharing keywords score higher.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Returns the all-zero vector for any text containing `poison`.
pub struct PoisonedEmbedder {
    pub poison: &'static str,
}

#[async_trait]
impl Embedder for PoisonedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_batch(&[text.to_string()]).await?.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains(self.poison) {
                    vec![0.0; VOCABULARY.len() + 1]
                } else {
                    KeywordEmbedder::vector(t)
                }
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(DocragError::OpenAI("embedding service unavailable".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(DocragError::OpenAI("embedding service unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len() + 1
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Records every prompt and answers with a fixed string.
pub struct RecordingGenerator {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }

    fn model(&self) -> &str {
        "recording-test"
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String> {
        Err(DocragError::OpenAI("generation service unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "failing-test"
    }
}

/// Sleeps longer than any test timeout before answering.
pub struct StalledGenerator;

#[async_trait]
impl Generator for StalledGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".to_string())
    }

    fn model(&self) -> &str {
        "stalled-test"
    }
}
