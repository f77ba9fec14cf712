//! Context formatting for QA prompts.

use crate::index::ScoredChunk;

/// Concatenate retrieved chunks into the prompt context.
pub fn format_context_for_prompt(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|hit| hit.chunk.content.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format retrieved chunks as a source list for the terminal.
pub fn format_sources_for_display(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|hit| {
            let preview: String = hit.chunk.content.chars().take(80).collect();
            format!(
                "[{}] page {} (score: {:.2}) {}",
                hit.chunk.order + 1,
                hit.chunk.page,
                hit.score,
                preview.replace('\n', " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn hit(order: usize, page: u32, content: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                order,
                page,
                start: 0,
                content: content.to_string(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_context_is_stuffed_in_order() {
        let chunks = vec![hit(4, 2, " second \n"), hit(1, 1, "first")];
        assert_eq!(format_context_for_prompt(&chunks), "second\n\nfirst");
    }

    #[test]
    fn test_sources_display() {
        let display = format_sources_for_display(&[hit(0, 3, "line one\nline two")]);
        assert_eq!(display, "[1] page 3 (score: 0.50) line one line two");
    }
}
