//! Agent runner with the tool dispatch loop.

use super::chooser::{Action, ActionChooser, FINAL_ANSWER};
use super::session::Session;
use super::transcript::Role;
use crate::config::{AgentSettings, EarlyStopping, Prompts};
use crate::error::{MultitoolError, Result};
use crate::tools::{ToolKind, Toolbox};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default cap on tool calls per user turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Agent that answers a user turn, calling tools as the chooser decides.
pub struct Agent {
    chooser: Arc<dyn ActionChooser>,
    tools: Arc<Toolbox>,
    max_iterations: usize,
    early_stopping: EarlyStopping,
    prompts: Prompts,
}

impl Agent {
    pub fn new(chooser: Arc<dyn ActionChooser>, tools: Arc<Toolbox>) -> Self {
        Self {
            chooser,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            early_stopping: EarlyStopping::Generate,
            prompts: Prompts::default(),
        }
    }

    /// Apply the cap and stopping strategy from settings.
    pub fn with_settings(self, settings: &AgentSettings) -> Self {
        self.with_max_iterations(settings.max_iterations)
            .with_early_stopping(settings.early_stopping)
    }

    /// Set maximum tool calls per turn.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_early_stopping(mut self, strategy: EarlyStopping) -> Self {
        self.early_stopping = strategy;
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn tools(&self) -> &Arc<Toolbox> {
        &self.tools
    }

    /// Run one user turn against `session`.
    ///
    /// Tool failures and malformed actions are folded into the transcript as
    /// observations. Errors from the chooser itself end the turn and drop the
    /// turn's entries from the transcript, so a retry starts from the same
    /// history. Task list changes made by tools are kept.
    #[instrument(skip(self, session), fields(session = %session.id))]
    pub async fn run(&self, session: &mut Session, message: &str) -> Result<AgentResponse> {
        let start = session.transcript.len();
        let result = self.run_turn(session, message).await;
        if let Err(e) = &result {
            warn!("Turn failed, rolling back transcript: {}", e);
            session.transcript.truncate(start);
        }
        result
    }

    async fn run_turn(&self, session: &mut Session, message: &str) -> Result<AgentResponse> {
        info!("User turn: {}", message);
        session.transcript.push(Role::User, message);

        let registry = self.tools.registry();
        let mut tool_calls = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            debug!("Agent iteration {}", iterations);

            let action = match self.chooser.choose_action(&session.transcript, registry).await {
                Ok(action) => action,
                Err(MultitoolError::ActionFormat(reason)) => {
                    warn!("Malformed action: {}", reason);
                    let mut vars = HashMap::new();
                    vars.insert("error".to_string(), reason);
                    let note = self
                        .prompts
                        .render_with_custom(&self.prompts.agent.format_error, &vars);
                    session.transcript.push(Role::Observation, note);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match action {
                Action::Finish(answer) => {
                    session.transcript.push(Role::Assistant, answer.clone());
                    return Ok(AgentResponse {
                        content: answer,
                        tool_calls,
                        iterations,
                        stopped_early: false,
                    });
                }
                Action::UseTool { tool, input } => {
                    session.transcript.push(
                        Role::Action,
                        serde_json::json!({ "action": tool, "action_input": input }).to_string(),
                    );

                    let result = match ToolKind::from_name(&tool) {
                        Some(kind) => self.tools.run(kind, &input, &mut session.todo).await,
                        None => format!(
                            "'{}' is not a valid tool, try one of: {}, or '{}' to answer.",
                            tool,
                            registry.names().join(", "),
                            FINAL_ANSWER
                        ),
                    };

                    session.transcript.push(Role::Observation, result.clone());
                    tool_calls.push(ToolCallRecord {
                        name: tool,
                        input,
                        result,
                    });
                }
            }
        }

        info!("Reached {} iterations, stopping", self.max_iterations);
        let content = match self.early_stopping {
            EarlyStopping::Generate => self.chooser.conclude(&session.transcript).await?,
            EarlyStopping::Force => format!(
                "Agent stopped after {} iterations without a final answer.",
                self.max_iterations
            ),
        };
        session.transcript.push(Role::Assistant, content.clone());

        Ok(AgentResponse {
            content,
            tool_calls,
            iterations,
            stopped_early: true,
        })
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of actions requested from the chooser.
    pub iterations: usize,
    /// Whether the iteration cap ended the turn.
    pub stopped_early: bool,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// Input passed to the tool.
    pub input: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::transcript::Transcript;
    use crate::chunking::ChunkingConfig;
    use crate::index::tests::KeywordEmbedder;
    use crate::index::IndexBuilder;
    use crate::llm::{ChatMessage, Completer};
    use crate::rag::QaExecutor;
    use crate::tools::{DocReader, SearchProvider, ToolRegistry};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted actions, then repeats the last one.
    struct ScriptedChooser {
        script: Mutex<VecDeque<Result<Action>>>,
        concluded: Mutex<bool>,
        conclude_fails: bool,
    }

    impl ScriptedChooser {
        fn new(script: Vec<Result<Action>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                concluded: Mutex::new(false),
                conclude_fails: false,
            }
        }

        fn failing_conclude(mut self) -> Self {
            self.conclude_fails = true;
            self
        }
    }

    fn tool(name: &str, input: &str) -> Action {
        Action::UseTool {
            tool: name.to_string(),
            input: input.to_string(),
        }
    }

    #[async_trait]
    impl ActionChooser for ScriptedChooser {
        async fn choose_action(&self, _transcript: &Transcript, _tools: &ToolRegistry) -> Result<Action> {
            let mut script = self.script.lock().unwrap();
            match script.pop_front() {
                Some(next) => next,
                None => Ok(tool("calculator", "1+1")),
            }
        }

        async fn conclude(&self, transcript: &Transcript) -> Result<String> {
            *self.concluded.lock().unwrap() = true;
            if self.conclude_fails {
                return Err(MultitoolError::upstream("completion", "rate limited", false));
            }
            Ok(format!("concluded after {} turns", transcript.len()))
        }
    }

    struct NoSearch;

    #[async_trait]
    impl SearchProvider for NoSearch {
        async fn search(&self, _query: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    struct NoCompleter;

    #[async_trait]
    impl Completer for NoCompleter {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(String::new())
        }
    }

    fn agent(chooser: Arc<ScriptedChooser>) -> Agent {
        let embedder = Arc::new(KeywordEmbedder);
        let docs = DocReader::new(
            IndexBuilder::new(embedder.clone(), ChunkingConfig::default()),
            QaExecutor::new(Arc::new(NoCompleter), embedder),
        );
        Agent::new(chooser, Arc::new(Toolbox::new(Arc::new(NoSearch), Arc::new(docs))))
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let chooser = Arc::new(ScriptedChooser::new(vec![
            Ok(tool("Calculator", "6*7")),
            Ok(Action::Finish("The answer is 42.".to_string())),
        ]));
        let agent = agent(chooser);
        let mut session = Session::new("tester");

        let response = agent.run(&mut session, "what is 6*7?").await.unwrap();
        assert_eq!(response.content, "The answer is 42.");
        assert_eq!(response.iterations, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].result, "42");
        assert!(!response.stopped_early);

        let roles: Vec<Role> = session.transcript.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Action, Role::Observation, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_cap_then_generate() {
        let chooser = Arc::new(ScriptedChooser::new(vec![]));
        let agent = agent(chooser.clone());
        let mut session = Session::new("tester");

        let response = agent.run(&mut session, "loop forever").await.unwrap();
        assert_eq!(response.tool_calls.len(), DEFAULT_MAX_ITERATIONS);
        assert!(response.stopped_early);
        assert!(*chooser.concluded.lock().unwrap());
        assert!(response.content.starts_with("concluded after"));
    }

    #[tokio::test]
    async fn test_cap_then_force() {
        let chooser = Arc::new(ScriptedChooser::new(vec![]));
        let agent = agent(chooser.clone())
            .with_max_iterations(2)
            .with_early_stopping(EarlyStopping::Force);
        let mut session = Session::new("tester");

        let response = agent.run(&mut session, "loop forever").await.unwrap();
        assert_eq!(response.tool_calls.len(), 2);
        assert!(!*chooser.concluded.lock().unwrap());
        assert_eq!(
            response.content,
            "Agent stopped after 2 iterations without a final answer."
        );
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_actions_become_observations() {
        let chooser = Arc::new(ScriptedChooser::new(vec![
            Err(MultitoolError::ActionFormat("no JSON object found in the reply".to_string())),
            Ok(tool("shell", "rm -rf /")),
            Ok(Action::Finish("ok".to_string())),
        ]));
        let agent = agent(chooser);
        let mut session = Session::new("tester");

        let response = agent.run(&mut session, "hi").await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.iterations, 3);

        let observations: Vec<&str> = session
            .transcript
            .turns()
            .iter()
            .filter(|t| t.role == Role::Observation)
            .map(|t| t.text.as_str())
            .collect();
        assert!(observations[0].contains("no JSON object found"));
        assert!(observations[1].starts_with("'shell' is not a valid tool"));
    }

    #[tokio::test]
    async fn test_chooser_failure_ends_turn() {
        let chooser = Arc::new(ScriptedChooser::new(vec![Err(MultitoolError::upstream(
            "completion",
            "unauthorized",
            false,
        ))]));
        let agent = agent(chooser);
        let mut session = Session::new("tester");
        session.transcript.push(Role::User, "earlier");
        session.transcript.push(Role::Assistant, "reply");

        assert!(agent.run(&mut session, "hi").await.is_err());
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.transcript.last().unwrap().text, "reply");
    }

    #[tokio::test]
    async fn test_conclude_failure_rolls_back_turn() {
        let chooser = Arc::new(
            ScriptedChooser::new(vec![Ok(tool("todo", "add:pay rent"))]).failing_conclude(),
        );
        let agent = agent(chooser).with_max_iterations(2);
        let mut session = Session::new("tester");

        assert!(agent.run(&mut session, "plan my week").await.is_err());
        assert!(session.transcript.is_empty());
        assert_eq!(session.todo.render(), "1. pay rent");
    }

    #[tokio::test]
    async fn test_todo_is_session_state() {
        let chooser = Arc::new(ScriptedChooser::new(vec![
            Ok(tool("todo", "add:buy milk")),
            Ok(Action::Finish("added".to_string())),
        ]));
        let agent = agent(chooser);
        let mut first = Session::new("first");
        let second = Session::new("second");

        agent.run(&mut first, "remember milk").await.unwrap();
        assert_eq!(first.todo.render(), "1. buy milk");
        assert!(second.todo.is_empty());
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "calculator".to_string(),
            input: "2+2".to_string(),
            result: "4".to_string(),
        };
        assert_eq!(format!("{}", record), "calculator(2+2)");
    }
}
