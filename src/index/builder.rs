//! Building a [`DocumentIndex`] from a loaded document.

use super::{DocumentIndex, IndexEntry, IndexSource};
use crate::chunking::{chunk_document, ChunkingConfig};
use crate::document::SourceDocument;
use crate::embedding::Embedder;
use crate::error::{MultitoolError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

/// Chunks a document and embeds every chunk.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    config: ChunkingConfig,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, config: ChunkingConfig) -> Self {
        Self { embedder, config }
    }

    /// Build an index for `document`.
    ///
    /// Fails with `EmptyDocument` when the document has no pages and with
    /// `NoExtractableText` when its pages yield no text.
    #[instrument(skip_all, fields(document = %document.name))]
    pub async fn build(&self, document: &SourceDocument) -> Result<DocumentIndex> {
        if document.page_count() == 0 {
            return Err(MultitoolError::EmptyDocument(document.name.clone()));
        }

        let chunks = chunk_document(document, &self.config);
        if chunks.is_empty() {
            return Err(MultitoolError::NoExtractableText(document.name.clone()));
        }

        info!(
            "Embedding {} chunks from {} pages",
            chunks.len(),
            document.page_count()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(MultitoolError::upstream(
                "embedding",
                format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
                false,
            ));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        let source = IndexSource {
            path: document.path.clone(),
            name: document.name.clone(),
            page_count: document.page_count(),
            embedding_model: self.embedder.model().to_string(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            indexed_at: Utc::now(),
        };

        Ok(DocumentIndex::new(source, entries))
    }
}
