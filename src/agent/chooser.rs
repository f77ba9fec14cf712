//! Choosing the next action from the transcript.

use super::transcript::{Role, Transcript};
use crate::config::Prompts;
use crate::error::{MultitoolError, Result};
use crate::llm::{ChatMessage, Completer};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Action name that ends a turn in the JSON action protocol.
pub const FINAL_ANSWER: &str = "Final Answer";

/// What the agent does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    UseTool { tool: String, input: String },
    Finish(String),
}

/// Decides the next action for a turn.
#[async_trait]
pub trait ActionChooser: Send + Sync {
    /// Pick a tool call or a final answer.
    ///
    /// Output that cannot be read as an action is an `ActionFormat` error.
    async fn choose_action(&self, transcript: &Transcript, tools: &ToolRegistry) -> Result<Action>;

    /// Produce a final answer without using any more tools.
    async fn conclude(&self, transcript: &Transcript) -> Result<String>;
}

/// Action chooser backed by a completion service.
pub struct LlmActionChooser {
    completer: Arc<dyn Completer>,
    prompts: Prompts,
    fence_regex: Regex,
}

impl LlmActionChooser {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self {
            completer,
            prompts: Prompts::default(),
            fence_regex: Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("Invalid regex"),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    fn system_prompt(&self, tools: &ToolRegistry) -> String {
        let mut vars = HashMap::new();
        vars.insert("tools".to_string(), tools.describe());
        vars.insert("tool_names".to_string(), tools.names().join(", "));
        self.prompts.render_with_custom(&self.prompts.agent.system, &vars)
    }

    fn messages(&self, system: String, transcript: &Transcript) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(system)];
        for turn in transcript.turns() {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.text.clone()),
                Role::Action | Role::Assistant => ChatMessage::assistant(turn.text.clone()),
                Role::Observation => ChatMessage::user(format!("Observation: {}", turn.text)),
            });
        }
        messages
    }

    /// Read an action from model output.
    pub fn parse_action(&self, output: &str) -> Result<Action> {
        let body = match self.fence_regex.captures(output).and_then(|c| c.get(1)) {
            Some(fenced) => fenced.as_str(),
            None => output.trim(),
        };

        let json = match (body.find('{'), body.rfind('}')) {
            (Some(start), Some(end)) if start < end => &body[start..=end],
            _ => {
                return Err(MultitoolError::ActionFormat(
                    "no JSON object found in the reply".to_string(),
                ))
            }
        };

        let raw: RawAction = serde_json::from_str(json)
            .map_err(|e| MultitoolError::ActionFormat(e.to_string()))?;

        let input = match raw.action_input {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        if raw.action.trim().eq_ignore_ascii_case(FINAL_ANSWER) {
            Ok(Action::Finish(input))
        } else {
            Ok(Action::UseTool {
                tool: raw.action.trim().to_string(),
                input,
            })
        }
    }
}

#[derive(Deserialize)]
struct RawAction {
    action: String,
    #[serde(default)]
    action_input: Value,
}

#[async_trait]
impl ActionChooser for LlmActionChooser {
    async fn choose_action(&self, transcript: &Transcript, tools: &ToolRegistry) -> Result<Action> {
        let messages = self.messages(self.system_prompt(tools), transcript);
        let output = self.completer.complete(&messages).await?;
        debug!("Model replied: {}", output);
        self.parse_action(&output)
    }

    async fn conclude(&self, transcript: &Transcript) -> Result<String> {
        let messages = self.messages(self.prompts.agent.conclude.clone(), transcript);
        let output = self.completer.complete(&messages).await?;

        // Some models keep answering in the action format.
        match self.parse_action(&output) {
            Ok(Action::Finish(answer)) => Ok(answer),
            _ => Ok(output.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedCompleter {
        reply: String,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl Completer for ScriptedCompleter {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok(self.reply.clone())
        }
    }

    fn chooser(reply: &str) -> (LlmActionChooser, Arc<ScriptedCompleter>) {
        let completer = Arc::new(ScriptedCompleter {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        (LlmActionChooser::new(completer.clone()), completer)
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let (chooser, _) = chooser("");
        let action = chooser
            .parse_action("Sure.\n```json\n{\"action\": \"calculator\", \"action_input\": \"2+2\"}\n```")
            .unwrap();
        assert_eq!(
            action,
            Action::UseTool {
                tool: "calculator".to_string(),
                input: "2+2".to_string()
            }
        );
    }

    #[test]
    fn test_parse_bare_final_answer() {
        let (chooser, _) = chooser("");
        let action = chooser
            .parse_action(r#"{"action": "final answer", "action_input": "It is 4."}"#)
            .unwrap();
        assert_eq!(action, Action::Finish("It is 4.".to_string()));
    }

    #[test]
    fn test_non_string_input_is_serialized() {
        let (chooser, _) = chooser("");
        let action = chooser
            .parse_action(r#"{"action": "todo", "action_input": {"task": "x"}}"#)
            .unwrap();
        assert_eq!(
            action,
            Action::UseTool {
                tool: "todo".to_string(),
                input: r#"{"task":"x"}"#.to_string()
            }
        );
    }

    #[test]
    fn test_malformed_output() {
        let (chooser, _) = chooser("");
        assert!(matches!(
            chooser.parse_action("I think the answer is 4"),
            Err(MultitoolError::ActionFormat(_))
        ));
        assert!(matches!(
            chooser.parse_action(r#"{"tool": "calculator"}"#),
            Err(MultitoolError::ActionFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_prompt_lists_tools_and_transcript() {
        let (chooser, completer) =
            chooser(r#"{"action": "Final Answer", "action_input": "done"}"#);
        let mut transcript = Transcript::new();
        transcript.push(Role::User, "what is 2+2?");
        transcript.push(Role::Action, r#"{"action": "calculator", "action_input": "2+2"}"#);
        transcript.push(Role::Observation, "4");

        let action = chooser
            .choose_action(&transcript, &ToolRegistry::new())
            .await
            .unwrap();
        assert_eq!(action, Action::Finish("done".to_string()));

        let seen = completer.seen.lock().unwrap();
        assert!(seen[0].content.contains("calculator: Evaluates"));
        assert!(seen[0].content.contains("calculator, web_search, doc_reader, todo"));
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3].content, "Observation: 4");
    }

    #[tokio::test]
    async fn test_conclude_accepts_plain_text() {
        let (chooser, _) = chooser("  The answer is 4.  ");
        let answer = chooser.conclude(&Transcript::new()).await.unwrap();
        assert_eq!(answer, "The answer is 4.");
    }
}
