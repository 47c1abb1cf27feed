//! Word-count sizer for text-splitter.

use text_splitter::ChunkSizer;

/// Sizes a chunk by its number of whitespace-separated words.
///
/// Approximates subword token budgets without loading a model vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordSizer;

impl ChunkSizer for WordSizer {
    fn size(&self, chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }
}
