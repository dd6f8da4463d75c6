//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    top_k: Option<usize>,
    json: bool,
    verbose: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching documents...");
    let result = orchestrator.ask(question, verbose, top_k).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) if json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Ok(result) => {
            Output::answer(&result);
        }
        Err(e) => {
            Output::error(&format!("Failed to answer question: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
