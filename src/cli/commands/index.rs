//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Load a PDF, build its index and save it.
pub async fn run_index(path: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let index_path = settings.index_path();
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", path));
    let result = orchestrator.index_document(path).await;
    spinner.finish_and_clear();

    match result {
        Ok(message) => {
            Output::success(&message);
            Output::kv("Index", &index_path.display().to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            Err(e.into())
        }
    }
}
