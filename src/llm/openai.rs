//! Completion service backed by an OpenAI-compatible chat API.

use super::{ChatMessage, Completer, MessageRole};
use crate::config::ModelEndpoint;
use crate::error::{MultitoolError, Result};
use crate::openai::{create_client, is_transient};
use crate::retry::RetryPolicy;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat completion client for a configured model endpoint.
pub struct OpenAICompleter {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl OpenAICompleter {
    /// Create a completer from an endpoint. Fails if the API key is not set.
    pub fn from_endpoint(endpoint: &ModelEndpoint, retry: RetryPolicy) -> Result<Self> {
        let api_key = endpoint.api_key()?;
        Ok(Self {
            client: create_client(&endpoint.api_base, &api_key, retry.timeout)?,
            model: endpoint.model.clone(),
            temperature: endpoint.temperature,
            retry,
        })
    }

    fn to_request_messages(messages: &[ChatMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
        messages
            .iter()
            .map(|m| {
                let message: ChatCompletionRequestMessage = match m.role {
                    MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(build_error)?
                        .into(),
                    MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(build_error)?
                        .into(),
                    MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(build_error)?
                        .into(),
                };
                Ok(message)
            })
            .collect()
    }

    async fn request(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| MultitoolError::upstream("completion", e.to_string(), is_transient(&e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| MultitoolError::upstream("completion", "Empty response from model", false))
    }
}

fn build_error(e: async_openai::error::OpenAIError) -> MultitoolError {
    MultitoolError::upstream("completion", format!("Failed to build request: {}", e), false)
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request_messages = Self::to_request_messages(messages)?;

        let answer = self
            .retry
            .run("completion", || self.request(request_messages.clone()))
            .await?;

        debug!("Completion returned {} characters", answer.len());
        Ok(answer)
    }
}
