//! multitool - a conversational agent with tools
//!
//! An agent that answers each user turn by choosing among a small set of
//! tools until it can reply, served from the terminal or over HTTP.
//!
//! # Overview
//!
//! The agent can:
//! - Keep a per-user todo list (`add:<task>`, `list`, `remove:<number>`)
//! - Search the web for instant answers
//! - Load a PDF and answer questions about it with retrieval-QA
//! - Evaluate arithmetic expressions without running any code
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `document` - PDF loading
//! - `chunking` - Overlapping text chunks
//! - `embedding` / `llm` - OpenAI-compatible embedding and completion clients
//! - `index` - Document index, similarity search and SQLite persistence
//! - `rag` - Retrieval-QA over the index
//! - `tools` - Tool registry, command parser and the tools themselves
//! - `agent` - Action chooser, dispatch loop and sessions
//! - `auth` - Identity provider (sign-up, sign-in, token verification)
//! - `server` - HTTP API
//! - `orchestrator` - Wiring from settings
//!
//! # Example
//!
//! ```rust,no_run
//! use multitool::agent::Session;
//! use multitool::config::Settings;
//! use multitool::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.restore_index().await?;
//!
//!     let agent = orchestrator.build_agent()?;
//!     let mut session = Session::new("me");
//!     let response = agent.run(&mut session, "What is 12 * 7?").await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod auth;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retry;
pub mod server;
pub mod tools;

pub use error::{MultitoolError, Result};
