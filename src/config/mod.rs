//! Configuration module for multitool.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, QaPrompts};
pub use settings::{
    AgentSettings, AuthSettings, ChunkingSettings, EarlyStopping, EmbeddingSettings,
    GeneralSettings, IndexSettings, ModelEndpoint, NetworkSettings, PromptSettings, RagSettings,
    SearchSettings, ServerSettings, Settings,
};
