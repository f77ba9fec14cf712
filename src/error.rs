//! Error types for multitool.

use thiserror::Error;

/// Library-level error type for multitool operations.
#[derive(Error, Debug)]
pub enum MultitoolError {
    #[error("The PDF file '{0}' contains no pages or is corrupted")]
    EmptyDocument(String),

    #[error("Could not extract any text from the PDF file '{0}'. It may be empty or non-textual")]
    NoExtractableText(String),

    #[error("Please load a PDF first with 'load:<path_to_pdf>'")]
    NoIndexLoaded,

    #[error("Invalid mathematical expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid task number: {0}")]
    InvalidIndex(String),

    #[error("Unrecognized command '{input}'. Use {expected}")]
    UnrecognizedCommand { input: String, expected: String },

    #[error("Authentication failed: {0}")]
    AuthInvalid(String),

    #[error("Account rejected: {0}")]
    AccountRejected(String),

    #[error("{service} error: {message}")]
    Upstream {
        service: String,
        message: String,
        retryable: bool,
    },

    #[error("{service} did not respond within {secs}s")]
    Timeout { service: String, secs: u64 },

    #[error("Could not parse agent action: {0}")]
    ActionFormat(String),

    #[error("File {0} not found")]
    DocumentNotFound(String),

    #[error("Failed to read PDF: {0}")]
    Document(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl MultitoolError {
    /// Build an upstream error for a failed call to an external service.
    pub fn upstream(service: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self::Upstream {
            service: service.to_string(),
            message: message.into(),
            retryable,
        }
    }

    /// Whether retrying the failed call may succeed.
    ///
    /// Only transient network conditions qualify; anything caused by user
    /// input is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Upstream { retryable, .. } => *retryable,
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }
}

/// Result type alias for multitool operations.
pub type Result<T> = std::result::Result<T, MultitoolError>;
