//! Client construction for OpenAI-compatible APIs.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a client for an OpenAI-compatible API with a request timeout.
///
/// The timeout here backs up the per-call bound applied by
/// [`RetryPolicy`](crate::retry::RetryPolicy).
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Classify an async-openai error as retryable or not.
pub fn is_transient(error: &async_openai::error::OpenAIError) -> bool {
    use async_openai::error::OpenAIError;

    match error {
        OpenAIError::Reqwest(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        OpenAIError::ApiError(api) => api
            .r#type
            .as_deref()
            .is_some_and(|t| t.contains("server_error") || t.contains("rate_limit")),
        _ => false,
    }
}
