//! The document reader tool: load a PDF, then ask questions about it.

use super::command::{CommandParser, DocCommand};
use crate::config::Settings;
use crate::document::{base_name, load_pdf};
use crate::error::{MultitoolError, Result};
use crate::index::{DocumentIndex, IndexBuilder, IndexStore};
use crate::rag::QaExecutor;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Holds the currently loaded index, shared by every session.
pub struct DocReader {
    builder: IndexBuilder,
    qa: QaExecutor,
    store: Option<Arc<IndexStore>>,
    current: RwLock<Option<Arc<DocumentIndex>>>,
    parser: CommandParser,
}

impl DocReader {
    pub fn new(builder: IndexBuilder, qa: QaExecutor) -> Self {
        Self {
            builder,
            qa,
            store: None,
            current: RwLock::new(None),
            parser: CommandParser::new(),
        }
    }

    /// Persist every loaded index to `store`.
    pub fn with_store(mut self, store: IndexStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Load the persisted index, if any. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool> {
        let Some(store) = self.store.clone() else {
            return Ok(false);
        };

        let restored = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| MultitoolError::Document(format!("Index restore task failed: {}", e)))??;

        match restored {
            Some(index) => {
                info!(
                    "Restored index for {} ({} chunks)",
                    index.source.name,
                    index.len()
                );
                *self.current.write().await = Some(Arc::new(index));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The loaded index, if any.
    pub async fn current(&self) -> Option<Arc<DocumentIndex>> {
        self.current.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub fn qa(&self) -> &QaExecutor {
        &self.qa
    }

    /// Load, index and persist a PDF, replacing the current index.
    #[instrument(skip(self))]
    pub async fn load(&self, path: &str) -> Result<String> {
        let path = Settings::expand_path(path);
        let document = tokio::task::spawn_blocking(move || load_pdf(&path))
            .await
            .map_err(|e| MultitoolError::Document(format!("PDF loading task failed: {}", e)))??;

        let index = Arc::new(self.builder.build(&document).await?);
        let chunks = index.len();

        if let Some(store) = self.store.clone() {
            let saved = index.clone();
            tokio::task::spawn_blocking(move || store.save(&saved))
                .await
                .map_err(|e| MultitoolError::Document(format!("Index save task failed: {}", e)))??;
        }

        *self.current.write().await = Some(index);
        info!("Loaded {} ({} chunks)", document.name, chunks);

        Ok(format!(
            "Document {} loaded successfully ({} chunks)",
            document.name, chunks
        ))
    }

    /// Answer a question against the loaded index. Never fails.
    pub async fn ask(&self, question: &str) -> String {
        let index = self.current().await;
        self.qa.answer_for_tool(index.as_deref(), question).await
    }

    /// Run one line of tool input.
    pub async fn execute(&self, input: &str) -> Result<String> {
        match self.parser.parse_doc(input) {
            DocCommand::Load(path) => self.load(&path).await.map_err(|e| {
                warn!("Loading {} failed: {}", path, e);
                load_error(&path, e)
            }),
            DocCommand::Ask(question) => Ok(self.ask(&question).await),
        }
    }
}

/// Name the file in load failures that do not already mention it.
fn load_error(path: &str, error: MultitoolError) -> MultitoolError {
    match error {
        MultitoolError::DocumentNotFound(_)
        | MultitoolError::EmptyDocument(_)
        | MultitoolError::NoExtractableText(_)
        | MultitoolError::Document(_) => error,
        other => MultitoolError::Document(format!(
            "could not load or process '{}': {}",
            base_name(std::path::Path::new(path)),
            other
        )),
    }
}
