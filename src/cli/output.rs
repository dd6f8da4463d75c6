//! CLI output formatting utilities.

use crate::indexer::{DatabaseInfo, IndexingResult, SourceStats};
use crate::rag::{RagResult, Source};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print an answer followed by its sources.
    pub fn answer(result: &RagResult) {
        println!("\n{}", result.answer());

        if result.context_used() {
            Output::header("Sources");
            for (i, source) in result.sources().iter().enumerate() {
                Output::source(i + 1, source);
            }
        }
    }

    /// Print a cited source.
    pub fn source(index: usize, source: &Source) {
        println!(
            "  {} {} (page {}, score: {:.2})",
            style(format!("[{}]", index)).cyan(),
            style(&source.title).bold(),
            source.page,
            source.score
        );
        println!("      {}", style(&source.source).dim());
    }

    /// Print the outcome of an indexing run.
    pub fn indexing_result(result: &IndexingResult) {
        if result.success() {
            Output::success(result.message());
        } else {
            Output::error(result.message());
        }
        Output::kv("Files processed", &result.files_processed().to_string());
        Output::kv("Files skipped", &result.files_skipped().to_string());
        Output::kv("Chunks created", &result.chunks_created().to_string());
        Output::kv("Chunks indexed", &result.chunks_indexed().to_string());
    }

    /// Print database information.
    pub fn database_info(info: &DatabaseInfo) {
        Output::header("Database");
        Output::kv("Collection", &info.collection_name);
        Output::kv("Documents", &info.total_documents.to_string());
        Output::kv("Location", &info.location);
        Output::kv("Embedding model", &info.embedding_model);
    }

    /// Print statistics for one source document.
    pub fn source_stats(stats: &SourceStats) {
        println!(
            "  {} {} ({})",
            style("*").cyan(),
            style(&stats.source_name).bold(),
            style(&stats.file_type).dim()
        );
        println!(
            "      {} chunks, {} characters, avg {:.0} chars/chunk, {} pages",
            stats.chunk_count, stats.total_characters, stats.average_chunk_size, stats.unique_pages
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
