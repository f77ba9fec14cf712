//! Configuration settings for multitool.

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{MultitoolError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    /// Model driving the agent's reasoning.
    pub llm: ModelEndpoint,
    /// Model answering questions about the loaded document.
    #[serde(default = "ModelEndpoint::qa_default", deserialize_with = "qa_endpoint")]
    pub qa: ModelEndpoint,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub index: IndexSettings,
    pub rag: RagSettings,
    pub agent: AgentSettings,
    pub search: SearchSettings,
    pub auth: AuthSettings,
    pub server: ServerSettings,
    pub network: NetworkSettings,
    pub prompts: PromptSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            llm: ModelEndpoint::default(),
            qa: ModelEndpoint::qa_default(),
            embedding: EmbeddingSettings::default(),
            chunking: ChunkingSettings::default(),
            index: IndexSettings::default(),
            rag: RagSettings::default(),
            agent: AgentSettings::default(),
            search: SearchSettings::default(),
            auth: AuthSettings::default(),
            server: ServerSettings::default(),
            network: NetworkSettings::default(),
            prompts: PromptSettings::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.multitool".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// An OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEndpoint {
    /// Base URL of the API (up to and including the version segment).
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            model: "mistral-small-latest".to_string(),
            temperature: 0.3,
        }
    }
}

impl ModelEndpoint {
    /// Default endpoint for document question answering.
    pub fn qa_default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.0,
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        read_env_key(&self.api_key_env)
    }
}

/// Read a `[qa]` table, taking missing fields from [`ModelEndpoint::qa_default`].
fn qa_endpoint<'de, D>(deserializer: D) -> std::result::Result<ModelEndpoint, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct PartialEndpoint {
        api_base: Option<String>,
        api_key_env: Option<String>,
        model: Option<String>,
        temperature: Option<f32>,
    }

    let partial = PartialEndpoint::deserialize(deserializer)?;
    let defaults = ModelEndpoint::qa_default();
    Ok(ModelEndpoint {
        api_base: partial.api_base.unwrap_or(defaults.api_base),
        api_key_env: partial.api_key_env.unwrap_or(defaults.api_key_env),
        model: partial.model.unwrap_or(defaults.model),
        temperature: partial.temperature.unwrap_or(defaults.temperature),
    })
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub api_base: String,
    pub api_key_env: String,
    /// Embedding model to use.
    pub model: String,
    /// Requested dimensions, for models that accept the parameter.
    pub dimensions: Option<u32>,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai/v1".to_string(),
            api_key_env: "MISTRAL_API_KEY".to_string(),
            model: "mistral-embed".to_string(),
            dimensions: None,
            batch_size: 64,
        }
    }
}

impl EmbeddingSettings {
    pub fn api_key(&self) -> Result<String> {
        read_env_key(&self.api_key_env)
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Persisted index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Path of the on-disk index.
    pub path: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: "~/.multitool/index.db".to_string(),
        }
    }
}

/// Retrieval-QA settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Number of chunks retrieved per question.
    pub top_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// What the dispatch loop does when it runs out of tool iterations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EarlyStopping {
    /// Ask the model for a final answer from what it has gathered so far.
    #[default]
    Generate,
    /// Return a fixed message.
    Force,
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum tool calls per user turn.
    pub max_iterations: usize,
    pub early_stopping: EarlyStopping,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            early_stopping: EarlyStopping::Generate,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Search API endpoint.
    pub endpoint: String,
    /// Maximum related results included in the tool output.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.duckduckgo.com/".to_string(),
            max_results: 5,
        }
    }
}

/// Identity service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Environment variable holding the identity service web API key.
    pub api_key_env: String,
    /// Environment variable holding the path of the service credential file.
    pub credentials_env: String,
    /// Identity REST endpoint.
    pub endpoint: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_key_env: "FIREBASE_API_KEY".to_string(),
            credentials_env: "FIREBASE_CREDENTIALS_PATH".to_string(),
            endpoint: "https://identitytoolkit.googleapis.com/v1".to_string(),
        }
    }
}

impl AuthSettings {
    pub fn api_key(&self) -> Result<String> {
        read_env_key(&self.api_key_env)
    }

    /// Path of the credential file named by the environment.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        let path = Settings::expand_path(&read_env_key(&self.credentials_env)?);
        if !path.exists() {
            return Err(MultitoolError::Config(format!(
                "Identity credential file {} (from {}) does not exist",
                path.display(),
                self.credentials_env
            )));
        }
        Ok(path)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Conversations kept in memory. The least recently used is dropped first.
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_sessions: 1000,
        }
    }
}

/// Timeouts and retries for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient failures.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

fn read_env_key(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(MultitoolError::Config(format!("{} is empty", name))),
        Err(_) => Err(MultitoolError::Config(format!(
            "{} not set. Export it or add it to a .env file",
            name
        ))),
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(MultitoolError::Config(
                "chunking.chunk_size must be positive".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(MultitoolError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.agent.max_iterations == 0 {
            return Err(MultitoolError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.rag.top_k == 0 {
            return Err(MultitoolError::Config("rag.top_k must be at least 1".to_string()));
        }
        if self.server.max_sessions == 0 {
            return Err(MultitoolError::Config(
                "server.max_sessions must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("llm.api_base", &self.llm.api_base),
            ("qa.api_base", &self.qa.api_base),
            ("embedding.api_base", &self.embedding.api_base),
            ("search.endpoint", &self.search.endpoint),
            ("auth.endpoint", &self.auth.endpoint),
        ] {
            url::Url::parse(value).map_err(|e| {
                MultitoolError::Config(format!("{} is not a valid URL ({}): {}", key, value, e))
            })?;
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MultitoolError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("multitool")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded index path.
    pub fn index_path(&self) -> PathBuf {
        Self::expand_path(&self.index.path)
    }
}
