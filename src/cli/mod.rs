//! CLI module for multitool.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// multitool - a conversational agent with tools
///
/// Chat with an agent that can keep a todo list, search the web, answer
/// questions about a PDF and do arithmetic, or serve it over HTTP.
#[derive(Parser, Debug)]
#[command(name = "multitool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "MULTITOOL_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session with the agent
    Chat,

    /// Start the HTTP API (signup, login, chat, health)
    Serve {
        /// Host to bind to (defaults to server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load a PDF and build its searchable index
    Index {
        /// Path to the PDF file
        path: String,
    },

    /// Search the indexed document
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "3")]
        limit: usize,
    },

    /// Ask a question about the indexed document
    Ask {
        /// The question to ask
        question: String,
    },

    /// List the tools available to the agent
    Tools,

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

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
