//! Retrieval-augmented question answering over the loaded document.
//!
//! Retrieved chunks are "stuffed" into a single prompt and sent to the
//! completion service in one request.

pub mod context;
mod response;

pub use context::{format_context_for_prompt, format_sources_for_display};
pub use response::{QaExecutor, QaResponse, SEARCH_ERROR_PREFIX};
