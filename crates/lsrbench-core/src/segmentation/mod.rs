//! Document segmentation into bounded passages.
//!
//! Long documents are split into passages before they are written to the
//! corpus, so that downstream embedding models see inputs of bounded length.
//!
//! Uses the `text-splitter` crate, which picks the highest semantic level
//! (sentence, word, grapheme) at which content still fits the passage budget.
//! Segmentation is pure: the same text and budget always produce the same
//! boundaries.
//!
//! # Offsets
//!
//! Segment offsets are byte offsets into the original text, so
//! `&text[segment.offset_start..segment.offset_end] == segment.text` always
//! holds. Whitespace between passages is not part of any segment.

mod passage_splitter;
mod word_sizer;

use crate::config::{PassageUnit, DEFAULT_PASSAGE_SIZE};
use crate::model::Segment;

pub use passage_splitter::PassageSplitter;
pub use word_sizer::WordSizer;

/// Trait for document segmentation strategies.
pub trait SegmentationStrategy {
    /// Splits text into ordered, non-overlapping segments.
    ///
    /// Empty text yields no segments.
    fn segment(&self, text: &str) -> Vec<Segment>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &'static str;

    /// Returns the passage budget per segment.
    fn passage_size(&self) -> usize;
}

/// Creates a segmenter measuring passages in the given unit.
pub fn create_segmenter(unit: PassageUnit, passage_size: usize) -> Box<dyn SegmentationStrategy> {
    match unit {
        PassageUnit::Words => Box::new(PassageSplitter::words(passage_size)),
        PassageUnit::Characters => Box::new(PassageSplitter::characters(passage_size)),
    }
}

/// Segmenter with the default word budget.
pub fn default_segmenter() -> Box<dyn SegmentationStrategy> {
    create_segmenter(PassageUnit::Words, DEFAULT_PASSAGE_SIZE)
}
