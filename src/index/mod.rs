//! Searchable vector index over one document.
//!
//! The index is built from a [`SourceDocument`](crate::document::SourceDocument)
//! by [`IndexBuilder`], persisted by [`IndexStore`], and searched by cosine
//! similarity against a query embedded with the same [`Embedder`].

mod builder;
mod store;

pub use builder::IndexBuilder;
pub use store::IndexStore;

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Default number of chunks returned by a search.
pub const DEFAULT_TOP_K: usize = 3;

/// Message returned by [`query_index`] when nothing has been indexed.
pub const NO_INDEX_MESSAGE: &str = "No index available. Please index a PDF first.";

/// Metadata about the document an index was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSource {
    pub path: PathBuf,
    /// Base name of the document.
    pub name: String,
    pub page_count: usize,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub indexed_at: DateTime<Utc>,
}

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity with the query (higher is better).
    pub score: f32,
}

/// A searchable collection of chunk/embedding pairs for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentIndex {
    pub id: Uuid,
    pub source: IndexSource,
    /// Entries in chunk order.
    pub entries: Vec<IndexEntry>,
}

impl DocumentIndex {
    pub fn new(source: IndexSource, mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by_key(|e| e.chunk.order);
        Self {
            id: Uuid::new_v4(),
            source,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank chunks against a query embedding.
    ///
    /// Returns at most `k` chunks by descending similarity; equal scores keep
    /// document order.
    pub fn nearest(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // Stable sort: entries are already in chunk order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }

    /// Embed `query` and return the `k` most similar chunks.
    pub async fn search(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_embedding = embedder.embed(query).await?;
        let results = self.nearest(&query_embedding, k);
        debug!("Search returned {} of {} chunks", results.len(), self.len());
        Ok(results)
    }
}

/// Search an optional index and join the hits into one block of text.
///
/// A missing index is not an error: an explanatory message is returned.
pub async fn query_index(
    index: Option<&DocumentIndex>,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<String> {
    let Some(index) = index else {
        return Ok(NO_INDEX_MESSAGE.to_string());
    };

    let hits = index.search(embedder, query, k).await?;
    Ok(hits
        .iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n"))
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
