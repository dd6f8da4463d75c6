//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Options for the index command.
#[derive(Debug, Default)]
pub struct IndexArgs {
    pub paths: Vec<PathBuf>,
    pub dir: Option<PathBuf>,
    pub clear: bool,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

/// Run the index command.
pub async fn run_index(args: IndexArgs, mut settings: Settings) -> Result<()> {
    if let Some(size) = args.chunk_size {
        settings.chunking.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        settings.chunking.chunk_overlap = overlap;
    }

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if args.paths.is_empty() && args.dir.is_none() {
        Output::error("Nothing to index. Pass file paths or --dir.");
        anyhow::bail!("no input files");
    }

    let orchestrator = Orchestrator::new(settings)?;

    if args.clear {
        orchestrator.clear_database(true).await?;
        Output::info("Cleared existing documents.");
    }

    let spinner = Output::spinner("Indexing documents...");
    let result = match &args.dir {
        Some(dir) => {
            let dir_result = orchestrator.index_directory(dir).await;
            if args.paths.is_empty() {
                dir_result
            } else {
                // Index explicit files after the directory.
                match dir_result {
                    Ok(first) => {
                        spinner.set_message("Indexing files...");
                        Output::indexing_result(&first);
                        orchestrator.index_files(&args.paths).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
        None => orchestrator.index_files(&args.paths).await,
    };
    spinner.finish_and_clear();

    let result = result?;
    Output::indexing_result(&result);

    if !result.success() {
        anyhow::bail!("{}", result.message());
    }

    let info = orchestrator.database_info().await?;
    Output::kv("Total documents", &info.total_documents.to_string());
    Ok(())
}
