//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{MultitoolError, Result};
use crate::openai::{create_client, is_transient};
use crate::retry::RetryPolicy;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: Option<u32>,
    batch_size: usize,
    retry: RetryPolicy,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings. Fails if the API key is not set.
    pub fn from_settings(settings: &EmbeddingSettings, retry: RetryPolicy) -> Result<Self> {
        let api_key = settings.api_key()?;
        Ok(Self {
            client: create_client(&settings.api_base, &api_key, retry.timeout)?,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            batch_size: settings.batch_size.max(1),
            retry,
        })
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model).input(EmbeddingInput::StringArray(input));
        if let Some(dimensions) = self.dimensions {
            args.dimensions(dimensions);
        }
        let request = args
            .build()
            .map_err(|e| MultitoolError::upstream("embedding", format!("Failed to build request: {}", e), false))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| MultitoolError::upstream("embedding", e.to_string(), is_transient(&e)))?;

        // Sort by index to ensure correct order
        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| MultitoolError::upstream("embedding", "Empty embedding response", false))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self
                .retry
                .run("embedding", || self.request(batch.to_vec()))
                .await?;

            if embeddings.len() != batch.len() {
                return Err(MultitoolError::upstream(
                    "embedding",
                    format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
                    false,
                ));
            }
            all_embeddings.extend(embeddings);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
