//! Splitting document text into overlapping chunks for retrieval.
//!
//! Chunks are measured in characters. A chunk never exceeds `chunk_size`,
//! and each chunk starts exactly `chunk_overlap` characters before the end
//! of the previous one, so the document can be rebuilt from the chunks in
//! order. Cut points prefer paragraph breaks, then line breaks, then spaces,
//! and fall back to a hard cut.

use crate::config::ChunkingSettings;
use crate::document::SourceDocument;
use crate::error::{MultitoolError, Result};
use serde::{Deserialize, Serialize};

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters shared by consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Break points, most preferred first.
const SEPARATORS: [&[char]; 3] = [&['\n', '\n'], &['\n'], &[' ']];

/// A contiguous span of a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the document, starting at 0.
    pub order: usize,
    /// Page the chunk starts on.
    pub page: u32,
    /// Character offset of the chunk in the joined document text.
    pub start: usize,
    /// Text content of this chunk.
    pub content: String,
}

/// Size and overlap for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Create a config, rejecting an overlap that would stall the splitter.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(MultitoolError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }
}

/// Split text into `(start_offset, content)` spans.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut spans = Vec::new();

    if total == 0 {
        return spans;
    }

    let mut start = 0usize;
    loop {
        let hard_end = (start + config.chunk_size).min(total);
        let end = if hard_end == total {
            total
        } else {
            // Cutting at or before start + overlap would not advance.
            find_break(&chars, start + config.chunk_overlap + 1, hard_end).unwrap_or(hard_end)
        };

        spans.push((start, chars[start..end].iter().collect()));

        if end == total {
            break;
        }
        start = end - config.chunk_overlap;
    }

    spans
}

/// Latest position in `lo..=hi` that directly follows a separator.
fn find_break(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|sep| {
        (lo.max(sep.len())..=hi)
            .rev()
            .find(|&pos| &chars[pos - sep.len()..pos] == *sep)
    })
}

/// Split a document into ordered chunks tagged with their starting page.
pub fn chunk_document(document: &SourceDocument, config: &ChunkingConfig) -> Vec<Chunk> {
    let (text, page_starts) = document.joined_text();

    split_text(&text, config)
        .into_iter()
        .enumerate()
        .map(|(order, (start, content))| Chunk {
            order,
            page: page_for_offset(&page_starts, start),
            start,
            content,
        })
        .collect()
}

fn page_for_offset(page_starts: &[(usize, u32)], offset: usize) -> u32 {
    page_starts
        .iter()
        .take_while(|(page_start, _)| *page_start <= offset)
        .last()
        .map(|(_, page)| *page)
        .unwrap_or(1)
}
