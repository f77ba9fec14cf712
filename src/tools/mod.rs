//! The agent's tools and the registry that dispatches to them.
//!
//! Tools are a closed set described by [`ToolKind`]. Every tool takes one
//! line of text and returns text; [`Toolbox::run`] converts tool errors into
//! observations so a failing tool never ends a turn.

pub mod calculator;
pub mod command;
mod doc_reader;
pub mod todo;
pub mod web_search;

pub use command::{CommandParser, DocCommand, TodoCommand};
pub use doc_reader::DocReader;
pub use todo::TodoList;
pub use web_search::{search_for_tool, DuckDuckGoSearch, SearchProvider};

use crate::error::{MultitoolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// The available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Calculator,
    WebSearch,
    DocReader,
    Todo,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Calculator,
        ToolKind::WebSearch,
        ToolKind::DocReader,
        ToolKind::Todo,
    ];

    /// Identifier used in agent actions.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Calculator => "calculator",
            ToolKind::WebSearch => "web_search",
            ToolKind::DocReader => "doc_reader",
            ToolKind::Todo => "todo",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ToolKind::Calculator => "Calculator",
            ToolKind::WebSearch => "Web Search",
            ToolKind::DocReader => "Document Reader",
            ToolKind::Todo => "Todo List",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::Calculator => {
                "Evaluates a mathematical expression such as '2+2', '3^2 % 5' or 'sqrt(16) * sin(pi/4)'. \
                 Supports + - * / % ^, parentheses, the constants pi, e and tau, and the functions \
                 sin cos tan asin acos atan sinh cosh tanh sqrt exp ln log log10 log2 abs floor ceil round."
            }
            ToolKind::WebSearch => {
                "Searches the web for current information. Input is the search query."
            }
            ToolKind::DocReader => {
                "Reads a PDF and answers questions about it. Use 'load:<path_to_pdf>' to load a document, \
                 then ask questions as plain text."
            }
            ToolKind::Todo => {
                "Manages the user's task list. Use 'add:<task>' to add a task, 'list' to show the tasks \
                 and 'remove:<number>' to delete one."
            }
        }
    }

    /// Case-insensitive lookup by identifier or display name.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::ALL
            .into_iter()
            .find(|kind| normalize(kind.name()) == wanted || normalize(kind.display_name()) == wanted)
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ToolKind {
    type Err = MultitoolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| {
            MultitoolError::InvalidInput(format!(
                "unknown tool '{}', expected one of: {}",
                s,
                ToolRegistry::new().names().join(", ")
            ))
        })
    }
}

/// Name and description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<ToolKind> for ToolDescriptor {
    fn from(kind: ToolKind) -> Self {
        Self {
            kind,
            name: kind.name(),
            description: kind.description(),
        }
    }
}

/// Descriptors for every tool, in a fixed order.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: ToolKind::ALL.into_iter().map(ToolDescriptor::from).collect(),
        }
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        let kind = ToolKind::from_name(name)?;
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    /// One `name: description` line per tool, for prompts.
    pub fn describe(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| format!("{}: {}", d.name, d.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Executors for the tools. Shared across sessions; the todo list is passed
/// in per call.
pub struct Toolbox {
    registry: ToolRegistry,
    search: Arc<dyn SearchProvider>,
    docs: Arc<DocReader>,
    parser: CommandParser,
}

impl Toolbox {
    pub fn new(search: Arc<dyn SearchProvider>, docs: Arc<DocReader>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            search,
            docs,
            parser: CommandParser::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn docs(&self) -> &Arc<DocReader> {
        &self.docs
    }

    /// Execute a tool.
    pub async fn execute(&self, kind: ToolKind, input: &str, todo: &mut TodoList) -> Result<String> {
        match kind {
            ToolKind::Calculator => calculator::calculate(input),
            ToolKind::WebSearch => Ok(search_for_tool(self.search.as_ref(), input).await),
            ToolKind::DocReader => self.docs.execute(input).await,
            ToolKind::Todo => {
                let command = self.parser.parse_todo(input)?;
                todo.execute(command)
            }
        }
    }

    /// Execute a tool, turning any error into a descriptive observation.
    pub async fn run(&self, kind: ToolKind, input: &str, todo: &mut TodoList) -> String {
        info!("Running tool {} with input: {}", kind, input);
        match self.execute(kind, input, todo).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {}", kind, e);
                e.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingConfig;
    use crate::index::tests::KeywordEmbedder;
    use crate::index::IndexBuilder;
    use crate::llm::{ChatMessage, Completer};
    use crate::rag::QaExecutor;
    use async_trait::async_trait;

    struct FixedSearch;

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, query: &str) -> Result<String> {
            Ok(format!("results for {}", query))
        }
    }

    struct SilentCompleter;

    #[async_trait]
    impl Completer for SilentCompleter {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(String::new())
        }
    }

    fn toolbox() -> Toolbox {
        let embedder = Arc::new(KeywordEmbedder);
        let docs = DocReader::new(
            IndexBuilder::new(embedder.clone(), ChunkingConfig::default()),
            QaExecutor::new(Arc::new(SilentCompleter), embedder),
        );
        Toolbox::new(Arc::new(FixedSearch), Arc::new(docs))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(ToolKind::from_name("Calculator"), Some(ToolKind::Calculator));
        assert_eq!(ToolKind::from_name("WEB_SEARCH"), Some(ToolKind::WebSearch));
        assert_eq!(ToolKind::from_name("web search"), Some(ToolKind::WebSearch));
        assert_eq!(ToolKind::from_name("Document Reader"), Some(ToolKind::DocReader));
        assert_eq!(ToolKind::from_name("todo list"), Some(ToolKind::Todo));
        assert_eq!(ToolKind::from_name("shell"), None);
        assert!("shell".parse::<ToolKind>().is_err());
    }

    #[test]
    fn test_registry_describes_every_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.names(), vec!["calculator", "web_search", "doc_reader", "todo"]);
        assert_eq!(registry.describe().lines().count(), 4);
        assert_eq!(registry.lookup("TODO").unwrap().kind, ToolKind::Todo);
    }

    #[tokio::test]
    async fn test_errors_become_observations() {
        let toolbox = toolbox();
        let mut todo = TodoList::new();

        let text = toolbox.run(ToolKind::Calculator, "import os", &mut todo).await;
        assert!(text.starts_with("Invalid mathematical expression"));

        let text = toolbox.run(ToolKind::Todo, "remove:1", &mut todo).await;
        assert_eq!(text, "Invalid task number: 1");

        let text = toolbox.run(ToolKind::Todo, "shout", &mut todo).await;
        assert!(text.starts_with("Unrecognized command"));
    }

    #[tokio::test]
    async fn test_tools_dispatch() {
        let toolbox = toolbox();
        let mut todo = TodoList::new();

        assert_eq!(toolbox.run(ToolKind::Calculator, "2+2", &mut todo).await, "4");
        assert_eq!(
            toolbox.run(ToolKind::WebSearch, "rust 2024", &mut todo).await,
            "results for rust 2024"
        );

        toolbox.run(ToolKind::Todo, "add:buy milk", &mut todo).await;
        assert_eq!(toolbox.run(ToolKind::Todo, "list", &mut todo).await, "1. buy milk");
        toolbox.run(ToolKind::Todo, "remove:1", &mut todo).await;
        assert_eq!(
            toolbox.run(ToolKind::Todo, "list", &mut todo).await,
            "Your task list is empty."
        );
    }
}
