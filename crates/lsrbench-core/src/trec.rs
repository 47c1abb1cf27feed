//! TREC run and qrel files.
//!
//! A run line has six whitespace-separated fields:
//! `<qid> Q0 <docid> <rank> <score> <tag>`. A qrel line has four:
//! `<qid> <iteration> <docid> <relevance>`. Files ending in `.gz` are
//! decompressed on the fly.

use crate::corpus::io::open_reader;
use crate::error::CorpusError;
use crate::model::Qrel;
use std::io::{BufRead, Lines};
use std::path::{Path, PathBuf};

/// One ranked entry of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub query_id: String,
    pub doc_id: String,
    pub rank: u32,
    pub score: f64,
}

impl RunEntry {
    pub fn new(query_id: impl Into<String>, doc_id: impl Into<String>, rank: u32, score: f64) -> Self {
        Self {
            query_id: query_id.into(),
            doc_id: doc_id.into(),
            rank,
            score,
        }
    }
}

/// A ranked result list, in file order (not necessarily sorted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub entries: Vec<RunEntry>,
}

impl Run {
    pub fn new(entries: Vec<RunEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<RunEntry> for Run {
    fn from_iter<I: IntoIterator<Item = RunEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Reads a TREC run from `run.txt` or `run.txt.gz`.
pub fn read_trec_run(path: &Path) -> Result<Run, CorpusError> {
    if !path.exists() {
        return Err(CorpusError::MissingArtifact(path.to_path_buf()));
    }

    let mut entries = Vec::new();
    for (line_num, line) in open_reader(path)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_run_line(&line).map_err(|message| {
            CorpusError::invalid_format(path, line_num + 1, message)
        })?);
    }

    tracing::debug!("Read {} run entries from {}", entries.len(), path.display());
    Ok(Run::new(entries))
}

fn parse_run_line(line: &str) -> Result<RunEntry, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(format!(
            "expected at least 5 whitespace-separated fields, got {}",
            parts.len()
        ));
    }

    let rank = parts[3]
        .parse()
        .map_err(|_| format!("invalid rank '{}'", parts[3]))?;
    let score: f64 = parts[4]
        .parse()
        .map_err(|_| format!("invalid score '{}'", parts[4]))?;
    if !score.is_finite() {
        return Err(format!("non-finite score '{}'", parts[4]));
    }

    Ok(RunEntry::new(parts[0], parts[2], rank, score))
}

/// Lazy reader over a TREC qrels file.
pub struct QrelReader {
    path: PathBuf,
    lines: Lines<Box<dyn BufRead>>,
    line_num: usize,
}

impl QrelReader {
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::MissingArtifact(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            lines: open_reader(path)?.lines(),
            line_num: 0,
        })
    }
}

impl Iterator for QrelReader {
    type Item = Result<Qrel, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_num += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                parse_qrel_line(&line)
                    .map_err(|message| CorpusError::invalid_format(&self.path, self.line_num, message)),
            );
        }
    }
}

/// Reads all judgments of a TREC qrels file.
pub fn read_trec_qrels(path: &Path) -> Result<Vec<Qrel>, CorpusError> {
    QrelReader::open(path)?.collect()
}

fn parse_qrel_line(line: &str) -> Result<Qrel, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(format!(
            "expected 4 whitespace-separated fields, got {}",
            parts.len()
        ));
    }
    let relevance: i32 = parts[3]
        .parse()
        .map_err(|_| format!("invalid relevance value '{}'", parts[3]))?;
    // Graded judgments collapse to binary relevance.
    let relevance = u8::from(relevance > 0);
    Ok(Qrel::new(parts[0], parts[2], relevance))
}
