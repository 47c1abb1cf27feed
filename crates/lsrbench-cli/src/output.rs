//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use crate::commands::{DatasetInfo, EmbeddingRow};
use lsrbench_core::corpus::ConstructionReport;
use lsrbench_core::model::{Document, Query};
use serde::Serialize;
use std::path::Path;

/// Maximum characters to show in text snippet
const SNIPPET_MAX_LEN: usize = 200;

/// Maximum token weights shown per embedding row
const WEIGHTS_MAX_SHOWN: usize = 8;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    directory: String,
    sampler: &'a str,
    sampled: usize,
    loaded: usize,
    skipped_documents: usize,
    segments: usize,
    corpus_reused: bool,
    queries_written: Option<usize>,
    queries_unjudged: usize,
    qrels_written: Option<usize>,
    qrels_dropped: usize,
}

/// Formats a construction report.
pub fn format_report(directory: &Path, report: &ConstructionReport, json: bool) -> String {
    if json {
        return to_json(&JsonReport {
            directory: directory.display().to_string(),
            sampler: &report.sampler,
            sampled: report.sampled,
            loaded: report.loaded,
            skipped_documents: report.skipped_documents,
            segments: report.segments,
            corpus_reused: report.corpus_reused,
            queries_written: report.truths.queries_written,
            queries_unjudged: report.truths.queries_unjudged,
            qrels_written: report.truths.qrels_written,
            qrels_dropped: report.truths.qrels_dropped,
        });
    }

    let mut output = format!("Corpus in {}\n", directory.display());
    if report.corpus_reused {
        output.push_str("   Corpus: already materialized\n");
    } else {
        output.push_str(&format!(
            "   Corpus: {} sampled ({}), {} loaded, {} skipped, {} segments\n",
            report.sampled,
            report.sampler,
            report.loaded,
            report.skipped_documents,
            report.segments
        ));
    }
    let truths = &report.truths;
    output.push_str(&format!(
        "   Queries: {} ({} unjudged)\n",
        written(truths.queries_written),
        truths.queries_unjudged
    ));
    output.push_str(&format!(
        "   Qrels: {} ({} dropped)",
        written(truths.qrels_written),
        truths.qrels_dropped
    ));
    output
}

fn written(count: Option<usize>) -> String {
    match count {
        Some(n) => format!("{} written", n),
        None => "already materialized".to_string(),
    }
}

pub fn format_datasets(ids: &[String], json: bool) -> String {
    if json {
        return to_json(ids);
    }
    ids.join("\n")
}

pub fn format_info(info: &DatasetInfo, json: bool) -> String {
    if json {
        return to_json(info);
    }

    let count = |value: Option<usize>| match value {
        Some(n) => n.to_string(),
        None => "-".to_string(),
    };
    let mut output = format!(
        "{}{}\n",
        info.id,
        if info.segmented { " (segmented)" } else { "" }
    );
    output.push_str(&format!("   Documents: {}\n", count(info.documents)));
    output.push_str(&format!("   Queries: {}\n", count(info.queries)));
    output.push_str(&format!("   Qrels: {}", count(info.qrels)));
    if !info.embedding_models.is_empty() {
        output.push_str(&format!(
            "\n   Embeddings: {}",
            info.embedding_models.join(", ")
        ));
    }
    output
}

pub fn format_docs(docs: &[Document], json: bool) -> String {
    if json {
        return to_json(docs);
    }
    if docs.is_empty() {
        return "No documents".to_string();
    }

    let mut output = String::new();
    for doc in docs {
        let segments = doc.segments.len();
        output.push_str(&format!(
            "{} ({} segment{})\n   {}\n",
            doc.doc_id,
            segments,
            if segments == 1 { "" } else { "s" },
            truncate_text(doc.default_text(), SNIPPET_MAX_LEN)
        ));
    }
    output.trim_end().to_string()
}

pub fn format_queries(queries: &[Query], json: bool) -> String {
    if json {
        return to_json(queries);
    }
    if queries.is_empty() {
        return "No queries".to_string();
    }
    queries
        .iter()
        .map(|q| format!("{}\t{}", q.query_id, q.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_embeddings(rows: &[EmbeddingRow], json: bool) -> String {
    if json {
        return to_json(rows);
    }
    if rows.is_empty() {
        return "No embeddings".to_string();
    }

    let mut output = String::new();
    for row in rows {
        let shown: Vec<String> = row
            .token_ids
            .iter()
            .zip(&row.weights)
            .take(WEIGHTS_MAX_SHOWN)
            .map(|(token, weight)| format!("{}:{:.2}", token, weight))
            .collect();
        let more = row.token_ids.len().saturating_sub(WEIGHTS_MAX_SHOWN);
        output.push_str(&format!("{} [{}]", row.id, shown.join(" ")));
        if more > 0 {
            output.push_str(&format!(" +{} more", more));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

/// Truncates text to a maximum length, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}
