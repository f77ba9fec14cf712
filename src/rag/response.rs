//! QA response generation.

use super::context::format_context_for_prompt;
use crate::config::Prompts;
use crate::embedding::Embedder;
use crate::error::{MultitoolError, Result};
use crate::index::{DocumentIndex, ScoredChunk, DEFAULT_TOP_K};
use crate::llm::{ChatMessage, Completer};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Prefix of the message returned to the agent when a question fails.
pub const SEARCH_ERROR_PREFIX: &str = "Error during search";

/// Answers questions about the loaded document.
pub struct QaExecutor {
    completer: Arc<dyn Completer>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    prompts: Prompts,
}

impl QaExecutor {
    pub fn new(completer: Arc<dyn Completer>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            completer,
            embedder,
            top_k: DEFAULT_TOP_K,
            prompts: Prompts::default(),
        }
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Retrieve context for `question` and ask the completion service.
    #[instrument(skip(self, index), fields(question = %question))]
    pub async fn ask(&self, index: Option<&DocumentIndex>, question: &str) -> Result<QaResponse> {
        let index = index.ok_or(MultitoolError::NoIndexLoaded)?;

        info!("Answering from {}", index.source.name);
        let sources = index
            .search(self.embedder.as_ref(), question, self.top_k)
            .await?;

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context_for_prompt(&sources));

        let messages = [
            ChatMessage::system(self.prompts.qa.system.clone()),
            ChatMessage::user(self.prompts.render_with_custom(&self.prompts.qa.user, &vars)),
        ];

        let answer = self.completer.complete(&messages).await?;
        debug!("Generated answer from {} chunks", sources.len());

        Ok(QaResponse { answer, sources })
    }

    /// Answer `question` and return the model's raw text.
    pub async fn answer(&self, index: Option<&DocumentIndex>, question: &str) -> Result<String> {
        Ok(self.ask(index, question).await?.answer)
    }

    /// Answer for the document tool: errors become user-facing text.
    pub async fn answer_for_tool(&self, index: Option<&DocumentIndex>, question: &str) -> String {
        match self.answer(index, question).await {
            Ok(answer) => answer,
            Err(MultitoolError::NoIndexLoaded) => MultitoolError::NoIndexLoaded.to_string(),
            Err(e) => {
                warn!("Document question failed: {}", e);
                format!("{}: {}", SEARCH_ERROR_PREFIX, e)
            }
        }
    }
}

/// An answer with the chunks it was generated from.
#[derive(Debug, Clone)]
pub struct QaResponse {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}
