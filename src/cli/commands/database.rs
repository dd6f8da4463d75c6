//! Info, stats and clear commands.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Show database information.
pub async fn run_info(settings: Settings) -> Result<()> {
    preflight::check(Operation::Inspect, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    let info = orchestrator.database_info().await?;
    Output::database_info(&info);
    Ok(())
}

/// Show per-document statistics.
pub async fn run_stats(settings: Settings) -> Result<()> {
    preflight::check(Operation::Inspect, &settings)?;
    let orchestrator = Orchestrator::new(settings)?;

    let stats = orchestrator.stats().await?;

    if stats.sources.is_empty() {
        Output::info("No documents indexed yet. Use 'docrag index <files>' to add some.");
        return Ok(());
    }

    Output::header(&format!(
        "{} ({} chunks from {} documents)",
        stats.collection_name,
        stats.total_chunks,
        stats.sources.len()
    ));
    for source in &stats.sources {
        Output::source_stats(source);
    }
    Ok(())
}

/// Delete every indexed document.
pub async fn run_clear(yes: bool, settings: Settings) -> Result<()> {
    preflight::check(Operation::Inspect, &settings)?;

    if !yes {
        Output::warning("This deletes every indexed document. Re-run with --yes to confirm.");
        return Ok(());
    }

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.clear_database(true).await?;
    Output::success("Database cleared.");
    Ok(())
}
