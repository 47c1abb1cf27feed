//! Query and qrel materialization.
//!
//! Queries are restricted to the judged ones and written as JSONL and XML.
//! Qrels are rewritten to opaque document ids; judgments for documents that
//! were not sampled are dropped and counted. Each target file is skipped if
//! it already exists.

use super::io::write_atomic;
use super::materializer::IdentifierMapping;
use crate::config::{QRELS_FILE, QUERIES_JSONL_FILE, QUERIES_XML_FILE};
use crate::error::CorpusError;
use crate::model::{Qrel, Query};
use quick_xml::escape::escape;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Counts reported by a truth materialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruthReport {
    /// Judged queries written, or `None` if the query files existed.
    pub queries_written: Option<usize>,
    /// Queries dropped because no qrel references them.
    pub queries_unjudged: usize,
    /// Qrels written, or `None` if the qrel file existed.
    pub qrels_written: Option<usize>,
    /// Qrels whose document is not in the mapping.
    pub qrels_dropped: usize,
}

/// Writes `queries.jsonl`, `queries.xml` and `qrels.txt` into a directory.
pub struct TruthMaterializer {
    directory: PathBuf,
}

impl TruthMaterializer {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    pub fn materialize(
        &self,
        queries: &[Query],
        qrels: &[Qrel],
        mapping: &IdentifierMapping,
    ) -> Result<TruthReport, CorpusError> {
        let mut report = TruthReport::default();

        let judged = judged_queries(queries, qrels);
        report.queries_unjudged = queries.len() - judged.len();
        report.queries_written = self.write_queries(&judged)?;

        let (written, dropped) = self.write_qrels(qrels, mapping)?;
        report.qrels_written = written;
        report.qrels_dropped = dropped;

        Ok(report)
    }

    /// Writes both query files, each only if absent. Returns the number of
    /// queries if at least one file was written.
    pub fn write_queries(&self, queries: &[&Query]) -> Result<Option<usize>, CorpusError> {
        let mut wrote = false;

        let jsonl = self.directory.join(QUERIES_JSONL_FILE);
        if !jsonl.exists() {
            write_atomic(&jsonl, |w| {
                for query in queries {
                    serde_json::to_writer(&mut *w, query)?;
                    w.write_all(b"\n")?;
                }
                Ok::<_, CorpusError>(())
            })?;
            wrote = true;
        }

        let xml = self.directory.join(QUERIES_XML_FILE);
        if !xml.exists() {
            write_atomic(&xml, |w| write_queries_xml(w, queries))?;
            wrote = true;
        }

        if wrote {
            info!("Wrote {} judged queries", queries.len());
            Ok(Some(queries.len()))
        } else {
            info!("Queries already materialized in {}", self.directory.display());
            Ok(None)
        }
    }

    /// Remaps and writes qrels if `qrels.txt` is absent.
    ///
    /// Returns the number written (or `None` when skipped) and the number
    /// dropped for documents missing from the mapping.
    pub fn write_qrels(
        &self,
        qrels: &[Qrel],
        mapping: &IdentifierMapping,
    ) -> Result<(Option<usize>, usize), CorpusError> {
        let target = self.directory.join(QRELS_FILE);
        let (remapped, dropped) = remap_qrels(qrels, mapping);
        if dropped > 0 {
            warn!("Skipped {} qrels for documents not in the corpus", dropped);
        }

        if target.exists() {
            info!("Qrels already materialized at {}", target.display());
            return Ok((None, dropped));
        }

        write_atomic(&target, |w| {
            for qrel in &remapped {
                writeln!(w, "{}", qrel.to_trec_line())?;
            }
            Ok::<_, CorpusError>(())
        })?;
        info!("Wrote {} qrels to {}", remapped.len(), target.display());
        Ok((Some(remapped.len()), dropped))
    }
}

/// Queries with at least one judgment, in input order.
pub fn judged_queries<'a>(queries: &'a [Query], qrels: &[Qrel]) -> Vec<&'a Query> {
    let judged: HashSet<&str> = qrels.iter().map(|q| q.query_id.as_str()).collect();
    queries
        .iter()
        .filter(|q| judged.contains(q.query_id.as_str()))
        .collect()
}

/// Rewrites qrels to opaque ids. Returns the remapped qrels and the number
/// of qrels whose document is not mapped.
pub fn remap_qrels(qrels: &[Qrel], mapping: &IdentifierMapping) -> (Vec<Qrel>, usize) {
    let inverse = mapping.inverse();
    let mut remapped = Vec::with_capacity(qrels.len());
    let mut dropped = 0;

    for qrel in qrels {
        match inverse.get(qrel.doc_id.as_str()) {
            Some(opaque) => remapped.push(Qrel::new(&qrel.query_id, *opaque, qrel.relevance)),
            None => dropped += 1,
        }
    }
    (remapped, dropped)
}

fn write_queries_xml(w: &mut dyn Write, queries: &[&Query]) -> Result<(), CorpusError> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, "<topics>")?;
    for query in queries {
        writeln!(w, r#"  <topic number="{}">"#, escape(query.query_id.as_str()))?;
        writeln!(w, "    <query>{}</query>", escape(query.text.as_str()))?;
        writeln!(w, "  </topic>")?;
    }
    writeln!(w, "</topics>")?;
    Ok(())
}
