//! Answer generation from an assembled prompt.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for text generation services.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a fully assembled prompt.
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;

    /// Name of the generation model.
    fn model(&self) -> &str;
}
