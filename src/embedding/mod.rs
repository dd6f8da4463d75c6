//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::{DocragError, Result};
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Name of the embedding model.
    fn model(&self) -> &str;
}

/// Check that a vector is usable for similarity search.
pub fn validate_embedding(embedding: &[f32], dimensions: usize) -> Result<()> {
    if embedding.is_empty() {
        return Err(DocragError::Embedding("empty embedding vector".to_string()));
    }
    if embedding.len() != dimensions {
        return Err(DocragError::Embedding(format!(
            "expected {} dimensions, got {}",
            dimensions,
            embedding.len()
        )));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(DocragError::Embedding("embedding contains non-finite values".to_string()));
    }
    if embedding.iter().all(|v| *v == 0.0) {
        return Err(DocragError::Embedding("embedding is all zeros".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_embedding() {
        assert!(validate_embedding(&[0.1, 0.2, 0.3], 3).is_ok());
        assert!(validate_embedding(&[], 3).is_err());
        assert!(validate_embedding(&[0.1, 0.2], 3).is_err());
        assert!(validate_embedding(&[0.1, f32::NAN, 0.3], 3).is_err());
        assert!(validate_embedding(&[0.0, 0.0, 0.0], 3).is_err());
    }
}
