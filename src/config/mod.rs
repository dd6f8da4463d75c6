//! Configuration module for docrag.
//!
//! Handles loading and validating application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, MemorySettings,
    OpenAISettings, RetrievalSettings, ServiceSettings, Settings, VectorStoreProvider,
    VectorStoreSettings,
};
