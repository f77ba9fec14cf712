//! Wiring for multitool.
//!
//! Builds the embedding and completion clients, the document reader and the
//! agent from [`Settings`], and exposes the document pipeline to the CLI.

use crate::agent::{ActionChooser, Agent, LlmActionChooser};
use crate::chunking::ChunkingConfig;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::index::{query_index, IndexBuilder, IndexStore};
use crate::llm::{Completer, OpenAICompleter};
use crate::rag::{QaExecutor, QaResponse};
use crate::retry::RetryPolicy;
use crate::tools::{DocReader, DuckDuckGoSearch, SearchProvider, Toolbox};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for multitool.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    docs: Arc<DocReader>,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Create an orchestrator from settings. Requires the embedding and QA keys.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let retry = RetryPolicy::from_settings(&settings.network);

        let embedder: Arc<dyn Embedder> =
            Arc::new(OpenAIEmbedder::from_settings(&settings.embedding, retry.clone())?);
        let qa_completer: Arc<dyn Completer> =
            Arc::new(OpenAICompleter::from_endpoint(&settings.qa, retry.clone())?);

        info!(
            "Using {} for embeddings and {} for document answers",
            settings.embedding.model, settings.qa.model
        );

        Self::with_components(settings, prompts, embedder, qa_completer)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        qa_completer: Arc<dyn Completer>,
    ) -> Result<Self> {
        let retry = RetryPolicy::from_settings(&settings.network);
        let chunking = ChunkingConfig::from_settings(&settings.chunking)?;

        let qa = QaExecutor::new(qa_completer, embedder.clone())
            .with_top_k(settings.rag.top_k)
            .with_prompts(prompts.clone());

        let docs = DocReader::new(IndexBuilder::new(embedder.clone(), chunking), qa)
            .with_store(IndexStore::new(settings.index_path()));

        Ok(Self {
            settings,
            prompts,
            embedder,
            docs: Arc::new(docs),
            retry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn docs(&self) -> Arc<DocReader> {
        self.docs.clone()
    }

    /// Load the persisted index so earlier documents are available at once.
    pub async fn restore_index(&self) -> Result<bool> {
        self.docs.restore().await
    }

    /// Build the agent with the configured reasoning model and web search.
    pub fn build_agent(&self) -> Result<Agent> {
        let completer: Arc<dyn Completer> =
            Arc::new(OpenAICompleter::from_endpoint(&self.settings.llm, self.retry.clone())?);
        let chooser = LlmActionChooser::new(completer).with_prompts(self.prompts.clone());
        let search = DuckDuckGoSearch::from_settings(&self.settings.search, self.retry.clone())?;

        info!("Agent model: {}", self.settings.llm.model);
        Ok(self.build_agent_with(Arc::new(chooser), Arc::new(search)))
    }

    /// Build the agent around the given chooser and search provider.
    pub fn build_agent_with(
        &self,
        chooser: Arc<dyn ActionChooser>,
        search: Arc<dyn SearchProvider>,
    ) -> Agent {
        let toolbox = Toolbox::new(search, self.docs.clone());
        Agent::new(chooser, Arc::new(toolbox))
            .with_settings(&self.settings.agent)
            .with_prompts(self.prompts.clone())
    }

    /// Load, index and persist a PDF.
    #[instrument(skip(self))]
    pub async fn index_document(&self, path: &str) -> Result<String> {
        self.docs.load(path).await
    }

    /// Search the loaded document and return the matching chunk texts.
    ///
    /// Without a loaded document this returns an explanatory message.
    pub async fn search(&self, query: &str, k: usize) -> Result<String> {
        let index = self.docs.current().await;
        query_index(index.as_deref(), self.embedder.as_ref(), query, k).await
    }

    /// Answer a question about the loaded document.
    pub async fn ask(&self, question: &str) -> Result<QaResponse> {
        let index = self.docs.current().await;
        self.docs.qa().ask(index.as_deref(), question).await
    }
}
