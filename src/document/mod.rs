//! Source documents and PDF loading.

use crate::error::{MultitoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// One page of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// A loaded document. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Base name of the file, used in user-facing messages.
    pub name: String,
    pub pages: Vec<Page>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, pages: Vec<Page>) -> Self {
        let path = path.into();
        let name = base_name(&path);
        Self { path, name, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenate page texts with blank lines between pages.
    ///
    /// Returns the text and, for every non-empty page, the character offset
    /// at which it starts.
    pub fn joined_text(&self) -> (String, Vec<(usize, u32)>) {
        let mut text = String::new();
        let mut page_starts = Vec::new();
        let mut offset = 0usize;

        for page in &self.pages {
            let page_text = page.text.trim();
            if page_text.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push_str("\n\n");
                offset += 2;
            }
            page_starts.push((offset, page.number));
            text.push_str(page_text);
            offset += page_text.chars().count();
        }

        (text, page_starts)
    }
}

/// Base name of a path, falling back to the full path.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load a PDF and extract text page by page.
///
/// Blocking; run it on a blocking thread from async code.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_pdf(path: &Path) -> Result<SourceDocument> {
    if !path.exists() {
        return Err(MultitoolError::DocumentNotFound(path.display().to_string()));
    }

    info!("Loading PDF: {}", path.display());

    let pdf = lopdf::Document::load(path)
        .map_err(|e| MultitoolError::Document(format!("'{}': {}", base_name(path), e)))?;

    let mut pages = Vec::new();
    for number in pdf.get_pages().keys() {
        let text = match pdf.extract_text(&[*number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not extract text from page {}: {}", number, e);
                String::new()
            }
        };
        pages.push(Page {
            number: *number,
            text,
        });
    }

    debug!("Loaded {} pages", pages.len());
    Ok(SourceDocument::new(path, pages))
}
