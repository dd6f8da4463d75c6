//! Error types for docrag.

use thiserror::Error;

/// Library-level error type for docrag operations.
#[derive(Error, Debug)]
pub enum DocragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document loading failed: {0}")]
    Loader(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DocragError {
    /// Whether this error reflects a misconfiguration that must be surfaced
    /// to the caller instead of being degraded into an empty answer.
    pub fn is_config(&self) -> bool {
        matches!(self, DocragError::Config(_))
    }
}

/// Result type alias for docrag operations.
pub type Result<T> = std::result::Result<T, DocragError>;
