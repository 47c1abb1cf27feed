//! Record types shared by the materializers and the dataset facade.
//!
//! The serde attributes match the persisted JSON layouts: segments are stored
//! as `{"start", "end", "text"}` and queries as `{"qid", "query"}`.

use crate::config::{QREL_DEFS, SEGMENT_ID_DELIMITER};
use serde::{Deserialize, Serialize};

/// A passage of a document with its byte offsets into the source text.
///
/// Invariant: `offset_start <= offset_end` and `text` equals
/// `source[offset_start..offset_end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "start")]
    pub offset_start: usize,
    #[serde(rename = "end")]
    pub offset_end: usize,
    pub text: String,
}

impl Segment {
    pub fn new(offset_start: usize, offset_end: usize, text: impl Into<String>) -> Self {
        Self {
            offset_start,
            offset_end,
            text: text.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.offset_end - self.offset_start
    }

    pub fn is_empty(&self) -> bool {
        self.offset_start == self.offset_end
    }
}

/// A document as stored in the corpus: an id and its ordered segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub segments: Vec<Segment>,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            doc_id: doc_id.into(),
            segments,
        }
    }

    /// Text of the first segment, or the empty string for a document
    /// without segments.
    pub fn default_text(&self) -> &str {
        self.segments.first().map(|s| s.text.as_str()).unwrap_or("")
    }

    /// Flattens this document into one pseudo-document per segment.
    pub fn into_segmented(self) -> impl Iterator<Item = SegmentedDocument> {
        let doc_id = self.doc_id;
        self.segments
            .into_iter()
            .enumerate()
            .map(move |(index, segment)| SegmentedDocument {
                doc_id: segment_doc_id(&doc_id, index),
                segment,
            })
    }
}

/// A single segment exposed as an independent document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedDocument {
    /// Synthesized id `"<doc_id>___<index>___"`.
    pub doc_id: String,
    pub segment: Segment,
}

impl SegmentedDocument {
    pub fn default_text(&self) -> &str {
        &self.segment.text
    }
}

impl From<SegmentedDocument> for Document {
    /// A document holding just this segment, under the synthesized id.
    fn from(segmented: SegmentedDocument) -> Self {
        Document::new(segmented.doc_id, vec![segmented.segment])
    }
}

/// Builds the segmented-view id for segment `index` of `doc_id`.
pub fn segment_doc_id(doc_id: &str, index: usize) -> String {
    format!("{doc_id}{SEGMENT_ID_DELIMITER}{index}{SEGMENT_ID_DELIMITER}")
}

/// Splits a segmented-view id back into `(doc_id, segment_index)`.
///
/// Returns `None` for ids that were not produced by [`segment_doc_id`].
pub fn parse_segment_doc_id(id: &str) -> Option<(&str, usize)> {
    let rest = id.strip_suffix(SEGMENT_ID_DELIMITER)?;
    let split = rest.rfind(SEGMENT_ID_DELIMITER)?;
    let index = rest[split + SEGMENT_ID_DELIMITER.len()..].parse().ok()?;
    Some((&rest[..split], index))
}

/// A query with its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "qid")]
    pub query_id: String,
    #[serde(rename = "query")]
    pub text: String,
}

impl Query {
    pub fn new(query_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            text: text.into(),
        }
    }
}

/// A binary relevance judgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qrel {
    pub query_id: String,
    pub doc_id: String,
    pub relevance: u8,
}

impl Qrel {
    pub fn new(query_id: impl Into<String>, doc_id: impl Into<String>, relevance: u8) -> Self {
        Self {
            query_id: query_id.into(),
            doc_id: doc_id.into(),
            relevance,
        }
    }

    /// Human-readable label for this judgment's relevance grade.
    pub fn label(&self) -> Option<&'static str> {
        QREL_DEFS
            .iter()
            .find(|(grade, _)| *grade == self.relevance)
            .map(|(_, label)| *label)
    }

    /// Formats the judgment as a TREC qrel line (without newline).
    pub fn to_trec_line(&self) -> String {
        format!("{} 0 {} {}", self.query_id, self.doc_id, self.relevance)
    }
}
