//! docrag - Grounded question answering over your documents
//!
//! A local-first CLI tool and HTTP service that indexes PDF, text and Markdown
//! files and answers questions with citations to the documents used.
//!
//! # Overview
//!
//! docrag allows you to:
//! - Index documents into a persistent vector store
//! - Ask questions and get answers grounded in the indexed text
//! - Hold multi-turn conversations with bounded memory
//! - Serve the same pipeline over HTTP
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `loader` - PDF and text extraction
//! - `chunking` - Recursive chunking with overlap and page attribution
//! - `embedding` - Embedding generation
//! - `generation` - Answer generation
//! - `vector_store` - Vector database abstraction
//! - `indexer` - Document indexing and collection lifecycle
//! - `rag` - Retrieval, prompt assembly, memory and the answer engine
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use docrag::config::Settings;
//! use docrag::orchestrator::Orchestrator;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let indexed = orchestrator.index_files(&[PathBuf::from("guide.pdf")]).await?;
//!     println!("Indexed {} chunks", indexed.chunks_indexed());
//!
//!     let result = orchestrator.ask("Do I need a visa?", false, None).await?;
//!     println!("{}", result.format_for_display());
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod indexer;
pub mod loader;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DocragError, Result};
