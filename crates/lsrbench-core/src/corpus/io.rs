//! File helpers shared by the materializers and the dataset readers.
//!
//! Every artifact is written to a temporary file in the target's directory and
//! renamed into place once complete, so the presence of an artifact implies
//! that it was fully written.

use crate::error::CorpusError;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Returns true when `path` should be read or written through gzip.
pub fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Opens a file for buffered reading, transparently decompressing `.gz`.
pub fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Creates an empty temporary file next to `target`.
pub fn temp_sibling(target: &Path) -> io::Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    tempfile::Builder::new().prefix(".partial-").tempfile_in(dir)
}

/// Flushes a finished temporary file to disk and renames it to `target`.
pub fn persist(tmp: NamedTempFile, target: &Path) -> io::Result<()> {
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Writes `target` atomically. The closure receives a buffered writer that
/// gzip-compresses when the target name ends in `.gz`.
pub fn write_atomic<E, F>(target: &Path, write: F) -> Result<(), E>
where
    E: From<io::Error>,
    F: FnOnce(&mut dyn Write) -> Result<(), E>,
{
    let mut tmp = temp_sibling(target)?;
    {
        let mut buffered = BufWriter::new(tmp.as_file_mut());
        if is_gzip(target) {
            let mut encoder = GzEncoder::new(&mut buffered, Compression::default());
            write(&mut encoder)?;
            encoder.finish()?;
        } else {
            write(&mut buffered)?;
        }
        buffered.flush()?;
    }
    persist(tmp, target)?;
    Ok(())
}

/// Lazy reader over a JSON-lines file.
///
/// Blank lines are skipped. Parse failures carry the 1-based line number.
pub struct JsonlReader<T> {
    path: PathBuf,
    lines: Lines<Box<dyn BufRead>>,
    line_num: usize,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::MissingArtifact(path.to_path_buf()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            lines: open_reader(path)?.lines(),
            line_num: 0,
            _marker: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonlReader<T> {
    type Item = Result<T, CorpusError>;

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
            return Some(serde_json::from_str(&line).map_err(|e| {
                CorpusError::invalid_format(&self.path, self.line_num, e.to_string())
            }));
        }
    }
}
