//! CLI module for docrag.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docrag - Grounded question answering over your documents
///
/// Index PDF, text and Markdown files into a local vector store, then ask
/// questions and get answers that cite the documents they came from.
#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DOCRAG_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index documents into the vector store
    Index {
        /// Files to index (pdf, txt, md)
        paths: Vec<PathBuf>,

        /// Index every supported file in a directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Clear the collection before indexing
        #[arg(long)]
        clear: bool,

        /// Override the chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override the chunk overlap in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Ask a question and get an answer from your documents
    Ask {
        /// The question to ask
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive chat session
    Chat {
        /// Remember previous turns (overrides memory.enabled)
        #[arg(short, long)]
        memory: bool,
    },

    /// Show database information
    Info,

    /// Show per-document statistics
    Stats,

    /// Delete every indexed document
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Open configuration file in editor
    Edit,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
