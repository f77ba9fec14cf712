//! Interactive chat with the agent.

use crate::agent::Session;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Owner name for the local terminal session.
const LOCAL_USER: &str = "local";

/// Run the interactive chat command.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    match orchestrator.restore_index().await {
        Ok(true) => {
            if let Some(index) = orchestrator.docs().current().await {
                Output::info(&format!(
                    "Restored index for {} ({} chunks)",
                    index.source.name,
                    index.len()
                ));
            }
        }
        Ok(false) => {}
        Err(e) => warn!("Could not restore the saved index: {}", e),
    }

    let agent = orchestrator.build_agent()?;
    let mut session = Session::new(LOCAL_USER);

    println!("\n{}", style("multitool chat").bold().cyan());
    println!(
        "{}\n",
        style("Type a message, 'tools' to list tools, 'clear' to reset the conversation or 'exit' to quit.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            session.reset();
            Output::info("Conversation history cleared. Your task list is kept.");
            continue;
        }

        if input.eq_ignore_ascii_case("tools") {
            for descriptor in agent.tools().registry().descriptors() {
                Output::list_item(&format!("{}: {}", descriptor.name, descriptor.description));
            }
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = agent.run(&mut session, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                for call in &response.tool_calls {
                    println!("{}", style(format!("  [{}]", call)).dim());
                }
                println!("\n{} {}\n", style("Assistant:").cyan().bold(), response.content);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
