//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.restore_index().await?;

    let spinner = Output::spinner("Searching...");
    let results = orchestrator.search(query, limit.max(1)).await;
    spinner.finish_and_clear();

    match results {
        Ok(text) if text.is_empty() => {
            Output::warning("No results found matching your query.");
        }
        Ok(text) => {
            println!("\n{}\n", text);
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
