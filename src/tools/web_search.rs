//! Web search through the DuckDuckGo Instant Answer API.

use crate::config::SearchSettings;
use crate::error::{MultitoolError, Result};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// A service that answers a free-text query with text.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// Search for the web search tool: failures become a user-facing message.
pub async fn search_for_tool(provider: &dyn SearchProvider, query: &str) -> String {
    match provider.search(query).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Web search failed: {}", e);
            format!("Error during web search: {}", e)
        }
    }
}

/// DuckDuckGo Instant Answer client.
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    max_results: usize,
    retry: RetryPolicy,
}

impl DuckDuckGoSearch {
    pub fn from_settings(settings: &SearchSettings, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(retry.timeout)
            .user_agent(concat!("multitool/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            max_results: settings.max_results,
            retry,
        })
    }

    async fn request(&self, query: &str) -> Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MultitoolError::upstream(
                "search",
                format!("HTTP {}", status),
                status.is_server_error() || status.as_u16() == 429,
            ));
        }

        // The API answers with a javascript content type, so decode by hand.
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<String> {
        let body = self.retry.run("search", || self.request(query)).await?;
        let text = format_instant_answer(&body, self.max_results)
            .unwrap_or_else(|| format!("No results found for '{}'.", query));
        debug!("Search returned {} characters", text.len());
        Ok(text)
    }
}

/// Render an Instant Answer response as plain text, or `None` if it is empty.
pub fn format_instant_answer(body: &Value, max_results: usize) -> Option<String> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let mut sections = Vec::new();

    if let Some(answer) = field("Answer") {
        sections.push(answer.to_string());
    }

    if let Some(abstract_text) = field("AbstractText") {
        let mut section = match field("Heading") {
            Some(heading) => format!("{}: {}", heading, abstract_text),
            None => abstract_text.to_string(),
        };
        if let Some(url) = field("AbstractURL") {
            let source = field("AbstractSource").unwrap_or("source");
            section.push_str(&format!(" ({}: {})", source, url));
        }
        sections.push(section);
    }

    if let Some(definition) = field("Definition") {
        sections.push(format!("Definition: {}", definition));
    }

    let mut related = Vec::new();
    if let Some(topics) = body.get("RelatedTopics").and_then(Value::as_array) {
        collect_topics(topics, max_results, &mut related);
    }
    if !related.is_empty() {
        let lines: Vec<String> = related.iter().map(|r| format!("- {}", r)).collect();
        sections.push(format!("Related:\n{}", lines.join("\n")));
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Flatten related topics, including grouped ones, up to `limit` entries.
fn collect_topics(topics: &[Value], limit: usize, out: &mut Vec<String>) {
    for topic in topics {
        if out.len() >= limit {
            return;
        }
        if let Some(nested) = topic.get("Topics").and_then(Value::as_array) {
            collect_topics(nested, limit, out);
            continue;
        }
        let Some(text) = topic.get("Text").and_then(Value::as_str) else {
            continue;
        };
        match topic.get("FirstURL").and_then(Value::as_str) {
            Some(url) => out.push(format!("{} ({})", text, url)),
            None => out.push(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_abstract_and_related() {
        let body = json!({
            "Heading": "Rust (programming language)",
            "AbstractText": "Rust is a general-purpose programming language.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
            "Answer": "",
            "RelatedTopics": [
                {"Text": "Cargo - Rust package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
                {"Name": "See also", "Topics": [
                    {"Text": "Ferris - mascot", "FirstURL": "https://duckduckgo.com/Ferris"},
                    {"Text": "Crates.io", "FirstURL": "https://duckduckgo.com/Crates"}
                ]}
            ]
        });

        let text = format_instant_answer(&body, 2).unwrap();
        assert!(text.starts_with(
            "Rust (programming language): Rust is a general-purpose programming language. (Wikipedia: "
        ));
        assert!(text.contains("- Cargo - Rust package manager (https://duckduckgo.com/Cargo)"));
        assert!(text.contains("- Ferris - mascot"));
        assert!(!text.contains("Crates.io"));
    }

    #[test]
    fn test_direct_answer_comes_first() {
        let body = json!({"Answer": "42", "AbstractText": "", "RelatedTopics": []});
        assert_eq!(format_instant_answer(&body, 5).unwrap(), "42");
    }

    #[test]
    fn test_empty_response() {
        let body = json!({"Heading": "", "AbstractText": "", "RelatedTopics": []});
        assert!(format_instant_answer(&body, 5).is_none());
    }

    struct FailingSearch;

    #[async_trait]
    impl SearchProvider for FailingSearch {
        async fn search(&self, _query: &str) -> Result<String> {
            Err(MultitoolError::Timeout {
                service: "search".to_string(),
                secs: 30,
            })
        }
    }

    #[tokio::test]
    async fn test_failure_becomes_message() {
        let text = search_for_tool(&FailingSearch, "weather in Oslo").await;
        assert_eq!(text, "Error during web search: search did not respond within 30s");
    }
}
