//! Prompt templates for multitool.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    pub qa: QaPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the dispatch loop's reasoning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    /// System prompt. `{{tools}}` and `{{tool_names}}` are filled in.
    pub system: String,
    /// System prompt used when the iteration cap is reached and a final answer is needed.
    pub conclude: String,
    /// Observation recorded when the model's output is not a valid action.
    pub format_error: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful personal assistant. You can answer directly or use one of the following tools:

{{tools}}

To use a tool, reply with a single JSON object and nothing else:

```json
{"action": "<one of: {{tool_names}}>", "action_input": "<the tool input as a string>"}
```

The tool result will be sent back to you as an observation. When you can answer the user, reply with:

```json
{"action": "Final Answer", "action_input": "<your answer to the user>"}
```

Guidelines:
- Use at most one tool per reply
- Pass tool inputs exactly in the format the tool description asks for
- Use the calculator for arithmetic instead of computing in your head
- Answer in the user's language"#
                .to_string(),

            conclude: r#"You are a helpful personal assistant. No more tools can be used for this request. Using the conversation and the observations in it, write your final answer to the user now. Reply with plain text only."#
                .to_string(),

            format_error: r#"Your last reply was not a valid action ({{error}}). Reply with exactly one JSON object of the form {"action": "...", "action_input": "..."}."#
                .to_string(),
        }
    }
}

/// Prompts for document question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    pub system: String,
    /// User prompt. `{{question}}` and `{{context}}` are filled in.
    pub user: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            system: r#"Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer."#
                .to_string(),

            user: r#"{{context}}

Question: {{question}}
Helpful Answer:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                let content = std::fs::read_to_string(&qa_path)?;
                prompts.qa = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
