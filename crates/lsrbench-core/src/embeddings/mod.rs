//! Sparse embedding storage in compressed sparse row (CSR) layout.
//!
//! Embeddings of one text type (queries or documents) for one model live in
//! two files inside the model's directory:
//!
//! - `<text_type>-embeddings.npz`: zip of `data.npy` (f32 weights),
//!   `indices.npy` (token ids) and `indptr.npy` (row offsets)
//! - `<text_type>-ids.txt`: one id per line, line `i` naming row `i`
//!
//! Row `i` spans `data[indptr[i]..indptr[i + 1]]` and the same range of
//! `indices`. [`CsrMatrix`] enforces the layout invariants on construction,
//! so a matrix that exists is always consistent with its ids.

pub mod npy;

use crate::corpus::io::{persist, temp_sibling, write_atomic};
use crate::error::EmbeddingError;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DATA_ARRAY: &str = "data";
const INDICES_ARRAY: &str = "indices";
const INDPTR_ARRAY: &str = "indptr";

// =============================================================================
// Text Type
// =============================================================================

/// Which side of the retrieval task an embedding encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextType {
    Query,
    Document,
}

impl TextType {
    /// File name prefix of this text type's artifacts.
    pub fn as_str(self) -> &'static str {
        match self {
            TextType::Query => "query",
            TextType::Document => "doc",
        }
    }
}

impl fmt::Display for TextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" | "queries" => Ok(TextType::Query),
            "doc" | "docs" | "document" | "documents" => Ok(TextType::Document),
            other => Err(format!(
                "unknown text type '{other}', expected 'query' or 'doc'"
            )),
        }
    }
}

/// Directory name for a model, e.g. `naver/splade-v3` becomes
/// `naver-splade-v3`.
pub fn model_dir_name(model: &str) -> String {
    model.replace('/', "-")
}

// =============================================================================
// CSR Matrix
// =============================================================================

/// Validated sparse matrix with one named row per id.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    ids: Vec<String>,
    data: Vec<f32>,
    indices: Vec<u32>,
    indptr: Vec<usize>,
    positions: HashMap<String, usize>,
}

impl CsrMatrix {
    /// Builds a matrix from raw CSR arrays.
    ///
    /// # Errors
    ///
    /// [`EmbeddingError::InvalidLayout`] unless `indptr` has one more entry
    /// than `ids`, starts at 0, never decreases, and ends at
    /// `data.len() == indices.len()`. Duplicate ids are also rejected.
    pub fn from_parts(
        ids: Vec<String>,
        data: Vec<f32>,
        indices: Vec<u32>,
        indptr: Vec<usize>,
    ) -> Result<Self, EmbeddingError> {
        let invalid = |msg: String| Err(EmbeddingError::InvalidLayout(msg));

        if indptr.len() != ids.len() + 1 {
            return invalid(format!(
                "indptr has {} entries for {} ids",
                indptr.len(),
                ids.len()
            ));
        }
        if indptr[0] != 0 {
            return invalid(format!("indptr starts at {}", indptr[0]));
        }
        if let Some(pos) = indptr.windows(2).position(|w| w[0] > w[1]) {
            return invalid(format!("indptr decreases at row {pos}"));
        }
        if data.len() != indices.len() {
            return invalid(format!(
                "{} weights but {} token ids",
                data.len(),
                indices.len()
            ));
        }
        let nnz = indptr[indptr.len() - 1];
        if nnz != data.len() {
            return invalid(format!("indptr ends at {nnz} but data has {}", data.len()));
        }

        let mut positions = HashMap::with_capacity(ids.len());
        for (row, id) in ids.iter().enumerate() {
            if positions.insert(id.clone(), row).is_some() {
                return invalid(format!("duplicate id '{id}'"));
            }
        }

        Ok(Self {
            ids,
            data,
            indices,
            indptr,
            positions,
        })
    }

    /// Concatenates rows in input order.
    pub fn from_rows<I>(ids: Vec<String>, rows: I) -> Result<Self, EmbeddingError>
    where
        I: IntoIterator<Item = (Vec<u32>, Vec<f32>)>,
    {
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = vec![0];

        for (row, (token_ids, weights)) in rows.into_iter().enumerate() {
            if token_ids.len() != weights.len() {
                return Err(EmbeddingError::InvalidLayout(format!(
                    "row {row} has {} token ids but {} weights",
                    token_ids.len(),
                    weights.len()
                )));
            }
            indices.extend(token_ids);
            data.extend(weights);
            indptr.push(data.len());
        }

        Self::from_parts(ids, data, indices, indptr)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of stored weights across all rows.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Token ids and weights of row `row`.
    pub fn row(&self, row: usize) -> Option<(&[u32], &[f32])> {
        let start = *self.indptr.get(row)?;
        let end = *self.indptr.get(row + 1)?;
        Some((&self.indices[start..end], &self.data[start..end]))
    }

    /// Token ids and weights of the row named `id`.
    pub fn get(&self, id: &str) -> Result<(&[u32], &[f32]), EmbeddingError> {
        self.positions
            .get(id)
            .and_then(|&row| self.row(row))
            .ok_or_else(|| EmbeddingError::UnknownId(id.to_string()))
    }

    /// All rows as `(id, token_ids, weights)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32], &[f32])> + '_ {
        self.ids.iter().enumerate().map(move |(row, id)| {
            let (start, end) = (self.indptr[row], self.indptr[row + 1]);
            (
                id.as_str(),
                &self.indices[start..end],
                &self.data[start..end],
            )
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Embedding artifacts of one model, rooted at the model's directory.
#[derive(Debug, Clone)]
pub struct SparseEmbeddingStore {
    directory: PathBuf,
}

impl SparseEmbeddingStore {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn embeddings_path(&self, text_type: TextType) -> PathBuf {
        self.directory.join(format!("{text_type}-embeddings.npz"))
    }

    pub fn ids_path(&self, text_type: TextType) -> PathBuf {
        self.directory.join(format!("{text_type}-ids.txt"))
    }

    /// True when both artifacts of `text_type` exist.
    pub fn contains(&self, text_type: TextType) -> bool {
        self.embeddings_path(text_type).exists() && self.ids_path(text_type).exists()
    }

    /// Builds a matrix from `rows` and persists it.
    pub fn write<I>(
        &self,
        text_type: TextType,
        ids: Vec<String>,
        rows: I,
    ) -> Result<CsrMatrix, EmbeddingError>
    where
        I: IntoIterator<Item = (Vec<u32>, Vec<f32>)>,
    {
        let matrix = CsrMatrix::from_rows(ids, rows)?;
        self.write_matrix(text_type, &matrix)?;
        Ok(matrix)
    }

    /// Persists a matrix. The id list is written after the archive.
    pub fn write_matrix(&self, text_type: TextType, matrix: &CsrMatrix) -> Result<(), EmbeddingError> {
        write_npz(&self.embeddings_path(text_type), matrix)?;
        write_atomic(&self.ids_path(text_type), |w| {
            for id in matrix.ids() {
                writeln!(w, "{id}")?;
            }
            Ok::<_, EmbeddingError>(())
        })?;
        tracing::debug!(
            "Wrote {} {} embeddings to {}",
            matrix.len(),
            text_type,
            self.directory.display()
        );
        Ok(())
    }

    /// Reads and validates the embeddings of `text_type`.
    pub fn read(&self, text_type: TextType) -> Result<CsrMatrix, EmbeddingError> {
        let ids = read_ids(&self.ids_path(text_type))?;
        read_npz(&self.embeddings_path(text_type), ids)
    }
}

/// Reads a newline-delimited id list, one id per row. Ids are taken
/// verbatim; an empty line is an error since it would shift every later row.
pub fn read_ids(path: &Path) -> Result<Vec<String>, EmbeddingError> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if line.is_empty() {
                Err(EmbeddingError::InvalidLayout(format!(
                    "empty id on line {} of {}",
                    i + 1,
                    path.display()
                )))
            } else {
                Ok(line.to_string())
            }
        })
        .collect()
}

/// Reads an npz archive and pairs its rows with `ids`.
pub fn read_npz(path: &Path, ids: Vec<String>) -> Result<CsrMatrix, EmbeddingError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let data = read_array(&mut archive, DATA_ARRAY)?.into_f32(DATA_ARRAY)?;
    let indices = read_array(&mut archive, INDICES_ARRAY)?
        .into_indices(INDICES_ARRAY)?
        .into_iter()
        .map(|token| {
            u32::try_from(token).map_err(|_| EmbeddingError::UnsupportedArray {
                name: INDICES_ARRAY.to_string(),
                reason: format!("token id {token} exceeds u32"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let indptr: Vec<usize> = read_array(&mut archive, INDPTR_ARRAY)?
        .into_indices(INDPTR_ARRAY)?
        .into_iter()
        .map(|offset| offset as usize)
        .collect();

    let rows = indptr.len().saturating_sub(1);
    if ids.len() != rows {
        return Err(EmbeddingError::InvalidLayout(format!(
            "{} ids for {} rows in {}",
            ids.len(),
            rows,
            path.display()
        )));
    }

    CsrMatrix::from_parts(ids, data, indices, indptr)
}

fn read_array(
    archive: &mut ZipArchive<File>,
    name: &str,
) -> Result<npy::NpyArray, EmbeddingError> {
    let mut member = match archive.by_name(&format!("{name}.npy")) {
        Ok(member) => member,
        Err(ZipError::FileNotFound) => return Err(EmbeddingError::MissingArray(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::with_capacity(member.size() as usize);
    member.read_to_end(&mut bytes)?;
    npy::decode(name, &bytes)
}

/// Writes the CSR arrays as a deflated npz archive, atomically.
pub fn write_npz(path: &Path, matrix: &CsrMatrix) -> Result<(), EmbeddingError> {
    let indptr: Vec<i32> = matrix
        .indptr()
        .iter()
        .map(|&offset| {
            i32::try_from(offset).map_err(|_| {
                EmbeddingError::InvalidLayout(format!("offset {offset} exceeds int32 indptr"))
            })
        })
        .collect::<Result<_, _>>()?;

    let mut tmp = temp_sibling(path)?;
    {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(tmp.as_file_mut());

        zip.start_file(format!("{DATA_ARRAY}.npy"), options)?;
        zip.write_all(&npy::encode(matrix.data()))?;
        zip.start_file(format!("{INDICES_ARRAY}.npy"), options)?;
        zip.write_all(&npy::encode(matrix.indices()))?;
        zip.start_file(format!("{INDPTR_ARRAY}.npy"), options)?;
        zip.write_all(&npy::encode(&indptr))?;

        zip.finish()?;
    }
    persist(tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn example_rows() -> Vec<(Vec<u32>, Vec<f32>)> {
        vec![(vec![1, 2], vec![0.5, 0.5]), (vec![3], vec![1.0])]
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SparseEmbeddingStore::new(dir.path());

        store
            .write(TextType::Document, ids(&["a", "b"]), example_rows())
            .unwrap();
        let matrix = store.read(TextType::Document).unwrap();

        assert_eq!(matrix.indptr(), &[0, 2, 3]);
        assert_eq!(matrix.indices(), &[1, 2, 3]);
        assert_eq!(matrix.data(), &[0.5, 0.5, 1.0]);
        let (tokens, weights) = matrix.get("b").unwrap();
        assert_eq!(tokens, &[3]);
        assert_eq!(weights, &[1.0]);
    }

    #[test]
    fn test_artifact_names() {
        let store = SparseEmbeddingStore::new(Path::new("/cache/naver-splade-v3"));
        assert_eq!(
            store.embeddings_path(TextType::Query),
            Path::new("/cache/naver-splade-v3/query-embeddings.npz")
        );
        assert_eq!(
            store.ids_path(TextType::Document),
            Path::new("/cache/naver-splade-v3/doc-ids.txt")
        );
        assert_eq!(model_dir_name("naver/splade-v3"), "naver-splade-v3");
    }

    #[test]
    fn test_query_and_document_sets_are_separate() {
        let dir = TempDir::new().unwrap();
        let store = SparseEmbeddingStore::new(dir.path());
        store
            .write(TextType::Query, ids(&["q1"]), vec![(vec![9], vec![2.0])])
            .unwrap();

        assert!(store.contains(TextType::Query));
        assert!(!store.contains(TextType::Document));
        assert_eq!(store.read(TextType::Query).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let matrix = CsrMatrix::from_rows(ids(&["a", "b"]), example_rows()).unwrap();
        assert!(matches!(
            matrix.get("missing"),
            Err(EmbeddingError::UnknownId(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_iter_in_row_order() {
        let matrix = CsrMatrix::from_rows(ids(&["a", "b"]), example_rows()).unwrap();
        let rows: Vec<_> = matrix.iter().collect();
        assert_eq!(rows[0], ("a", &[1u32, 2][..], &[0.5f32, 0.5][..]));
        assert_eq!(rows[1], ("b", &[3u32][..], &[1.0f32][..]));
    }

    #[test]
    fn test_empty_rows_allowed() {
        let matrix = CsrMatrix::from_rows(
            ids(&["a", "b", "c"]),
            vec![(vec![], vec![]), (vec![4], vec![0.1]), (vec![], vec![])],
        )
        .unwrap();
        assert_eq!(matrix.indptr(), &[0, 0, 1, 1]);
        assert_eq!(matrix.get("c").unwrap().0.len(), 0);
    }

    #[test]
    fn test_layout_violations() {
        let bad = [
            // indptr length does not match ids
            (ids(&["a"]), vec![1.0], vec![1], vec![0, 1, 1]),
            // indptr does not start at zero
            (ids(&["a"]), vec![1.0], vec![1], vec![1, 1]),
            // indptr decreases
            (ids(&["a", "b"]), vec![1.0], vec![1], vec![0, 1, 0]),
            // indptr end disagrees with data
            (ids(&["a"]), vec![1.0, 2.0], vec![1, 2], vec![0, 1]),
            // data and indices differ in length
            (ids(&["a"]), vec![1.0], vec![1, 2], vec![0, 1]),
            // duplicate ids
            (ids(&["a", "a"]), vec![], vec![], vec![0, 0, 0]),
        ];
        for (ids, data, indices, indptr) in bad {
            assert!(matches!(
                CsrMatrix::from_parts(ids, data, indices, indptr),
                Err(EmbeddingError::InvalidLayout(_))
            ));
        }
    }

    #[test]
    fn test_mismatched_row_rejected() {
        let result = CsrMatrix::from_rows(ids(&["a"]), vec![(vec![1, 2], vec![0.5])]);
        assert!(matches!(result, Err(EmbeddingError::InvalidLayout(_))));
    }

    #[test]
    fn test_misaligned_ids_rejected_on_read() {
        let dir = TempDir::new().unwrap();
        let store = SparseEmbeddingStore::new(dir.path());
        store
            .write(TextType::Document, ids(&["a", "b"]), example_rows())
            .unwrap();
        fs::write(store.ids_path(TextType::Document), "a\nb\nc\n").unwrap();

        assert!(matches!(
            store.read(TextType::Document),
            Err(EmbeddingError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_blank_id_line_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SparseEmbeddingStore::new(dir.path());
        store
            .write(TextType::Document, ids(&["a", "b"]), example_rows())
            .unwrap();
        fs::write(store.ids_path(TextType::Document), "a\n\nb\n").unwrap();

        let err = store.read(TextType::Document).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidLayout(msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_id_count_must_match_rows() {
        let dir = TempDir::new().unwrap();
        let store = SparseEmbeddingStore::new(dir.path());
        store
            .write(TextType::Query, ids(&["q1", "q2"]), example_rows())
            .unwrap();
        fs::write(store.ids_path(TextType::Query), "q1\n").unwrap();

        let err = store.read(TextType::Query).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidLayout(msg) if msg.contains("1 ids for 2 rows")));

        // Ids are kept verbatim, including surrounding whitespace.
        fs::write(store.ids_path(TextType::Query), "q1 \nq2\n").unwrap();
        let matrix = store.read(TextType::Query).unwrap();
        assert!(matrix.get("q1 ").is_ok());
    }

    #[test]
    fn test_missing_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc-embeddings.npz");
        {
            let mut zip = ZipWriter::new(File::create(&path).unwrap());
            zip.start_file("data.npy", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(&npy::encode(&[1.0f32])).unwrap();
            zip.finish().unwrap();
        }

        assert!(matches!(
            read_npz(&path, ids(&["a"])),
            Err(EmbeddingError::MissingArray(name)) if name == "indices"
        ));
    }

    #[test]
    fn test_text_type_parsing() {
        assert_eq!("query".parse::<TextType>().unwrap(), TextType::Query);
        assert_eq!("documents".parse::<TextType>().unwrap(), TextType::Document);
        assert!("passages".parse::<TextType>().is_err());
    }
}
