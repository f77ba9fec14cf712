//! Pre-flight checks before starting a command.
//!
//! Validates that the API keys and credential files an operation needs are
//! available, so a command fails at startup instead of midway.

use crate::config::Settings;
use crate::error::{MultitoolError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Chat needs the agent model, the QA model and embeddings.
    Chat,
    /// Serving needs everything chat needs plus the identity service.
    Serve,
    /// Indexing and searching need embeddings.
    Index,
    Search,
    /// Asking needs embeddings and the QA model.
    Ask,
    /// Listing tools or showing config needs nothing.
    Offline,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error listing everything missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    let mut keys: Vec<&str> = Vec::new();
    let mut problems = Vec::new();

    match operation {
        Operation::Offline => {}
        Operation::Index | Operation::Search => {
            keys.push(&settings.embedding.api_key_env);
        }
        Operation::Ask => {
            keys.push(&settings.embedding.api_key_env);
            keys.push(&settings.qa.api_key_env);
        }
        Operation::Chat | Operation::Serve => {
            keys.push(&settings.llm.api_key_env);
            keys.push(&settings.qa.api_key_env);
            keys.push(&settings.embedding.api_key_env);
        }
    }

    if operation == Operation::Serve {
        keys.push(&settings.auth.api_key_env);
        if keys_present(&[settings.auth.credentials_env.as_str()]) {
            if let Err(e) = settings.auth.credentials_path() {
                problems.push(e.to_string());
            }
        } else {
            keys.push(&settings.auth.credentials_env);
        }
    }

    let mut missing: Vec<&str> = Vec::new();
    for key in keys {
        if !missing.contains(&key) && !keys_present(&[key]) {
            missing.push(key);
        }
    }

    if !missing.is_empty() {
        problems.insert(
            0,
            format!(
                "Missing environment variables: {}. Export them or add them to a .env file",
                missing.join(", ")
            ),
        );
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(MultitoolError::Config(problems.join("; ")))
    }
}

fn keys_present(names: &[&str]) -> bool {
    names
        .iter()
        .all(|name| std::env::var(name).is_ok_and(|v| !v.trim().is_empty()))
}
