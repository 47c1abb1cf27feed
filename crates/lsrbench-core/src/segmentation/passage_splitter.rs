//! Text-splitter adapter producing offset-annotated segments.

use super::{SegmentationStrategy, WordSizer};
use crate::model::Segment;
use text_splitter::{Characters, ChunkConfig, ChunkSizer, TextSplitter};

/// Splits text into passages with the `text-splitter` crate.
///
/// Chunks are trimmed, so a passage never starts or ends with whitespace.
/// Offsets come straight from the splitter's chunk indices, which keeps them
/// correct for repeated passages.
pub struct PassageSplitter<S: ChunkSizer> {
    passage_size: usize,
    name: &'static str,
    splitter: TextSplitter<S>,
}

impl PassageSplitter<WordSizer> {
    /// Passages of at most `passage_size` words.
    pub fn words(passage_size: usize) -> Self {
        Self::with_sizer(passage_size, WordSizer, "word-passages")
    }
}

impl PassageSplitter<Characters> {
    /// Passages of at most `passage_size` characters.
    pub fn characters(passage_size: usize) -> Self {
        Self::with_sizer(passage_size, Characters, "character-passages")
    }
}

impl<S: ChunkSizer> PassageSplitter<S> {
    fn with_sizer(passage_size: usize, sizer: S, name: &'static str) -> Self {
        let config = ChunkConfig::new(passage_size.max(1))
            .with_sizer(sizer)
            .with_trim(true);
        Self {
            passage_size,
            name,
            splitter: TextSplitter::new(config),
        }
    }
}

impl<S: ChunkSizer> SegmentationStrategy for PassageSplitter<S> {
    fn segment(&self, text: &str) -> Vec<Segment> {
        self.splitter
            .chunk_indices(text)
            .map(|(offset, chunk)| Segment::new(offset, offset + chunk.len(), chunk))
            .collect()
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn passage_size(&self) -> usize {
        self.passage_size
    }
}
