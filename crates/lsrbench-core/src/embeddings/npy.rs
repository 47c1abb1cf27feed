//! Minimal codec for one-dimensional `.npy` arrays.
//!
//! Only what sparse embedding archives need: little-endian numeric dtypes,
//! C order, one dimension. Format versions 1.0 and 2.0 are read; 1.0 is
//! written.
//!
//! ```text
//! \x93NUMPY <major:u8> <minor:u8> <header_len:u16|u32 LE>
//! {'descr': '<f4', 'fortran_order': False, 'shape': (N,), }<spaces>\n
//! <N little-endian values>
//! ```

use crate::error::EmbeddingError;

const MAGIC: &[u8] = b"\x93NUMPY";
/// Header plus preamble is padded to a multiple of this.
const ALIGNMENT: usize = 64;

/// Element types that can be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    F32,
    F64,
    I32,
    U32,
    I64,
}

impl Dtype {
    fn parse(descr: &str) -> Option<Self> {
        match descr {
            "<f4" => Some(Dtype::F32),
            "<f8" => Some(Dtype::F64),
            "<i4" => Some(Dtype::I32),
            "<u4" => Some(Dtype::U32),
            "<i8" => Some(Dtype::I64),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Dtype::F32 | Dtype::I32 | Dtype::U32 => 4,
            Dtype::F64 | Dtype::I64 => 8,
        }
    }
}

/// A decoded array, tagged by its stored dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyArray {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
}

impl NpyArray {
    pub fn len(&self) -> usize {
        match self {
            NpyArray::F32(v) => v.len(),
            NpyArray::F64(v) => v.len(),
            NpyArray::I32(v) => v.len(),
            NpyArray::U32(v) => v.len(),
            NpyArray::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values as `f32`. Integer arrays are rejected.
    pub fn into_f32(self, name: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            NpyArray::F32(v) => Ok(v),
            NpyArray::F64(v) => Ok(v.into_iter().map(|x| x as f32).collect()),
            _ => Err(unsupported(name, "expected a floating point array")),
        }
    }

    /// Values as non-negative integers. Float arrays and negative values
    /// are rejected.
    pub fn into_indices(self, name: &str) -> Result<Vec<u64>, EmbeddingError> {
        let negative = || unsupported(name, "negative value in index array");
        match self {
            NpyArray::U32(v) => Ok(v.into_iter().map(u64::from).collect()),
            NpyArray::I32(v) => v
                .into_iter()
                .map(|x| u64::try_from(x).map_err(|_| negative()))
                .collect(),
            NpyArray::I64(v) => v
                .into_iter()
                .map(|x| u64::try_from(x).map_err(|_| negative()))
                .collect(),
            _ => Err(unsupported(name, "expected an integer array")),
        }
    }
}

fn unsupported(name: &str, reason: impl Into<String>) -> EmbeddingError {
    EmbeddingError::UnsupportedArray {
        name: name.to_string(),
        reason: reason.into(),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes a complete `.npy` file.
pub fn decode(name: &str, bytes: &[u8]) -> Result<NpyArray, EmbeddingError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(unsupported(name, "missing npy magic"));
    }
    let major = bytes[MAGIC.len()];
    let mut pos = MAGIC.len() + 2;

    let header_len = match major {
        1 => {
            let raw = bytes
                .get(pos..pos + 2)
                .ok_or_else(|| unsupported(name, "truncated header"))?;
            pos += 2;
            u16::from_le_bytes([raw[0], raw[1]]) as usize
        }
        2 | 3 => {
            let raw = bytes
                .get(pos..pos + 4)
                .ok_or_else(|| unsupported(name, "truncated header"))?;
            pos += 4;
            u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        }
        other => return Err(unsupported(name, format!("npy version {other} not supported"))),
    };

    let header = bytes
        .get(pos..pos + header_len)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| unsupported(name, "truncated header"))?;
    let (dtype, len) = parse_header(name, header)?;
    let body = &bytes[pos + header_len..];

    let expected = len
        .checked_mul(dtype.width())
        .ok_or_else(|| unsupported(name, "shape too large"))?;
    if body.len() != expected {
        return Err(unsupported(
            name,
            format!("expected {expected} data bytes, found {}", body.len()),
        ));
    }

    Ok(match dtype {
        Dtype::F32 => NpyArray::F32(
            body.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::F64 => NpyArray::F64(
            body.chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        Dtype::I32 => NpyArray::I32(
            body.chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::U32 => NpyArray::U32(
            body.chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        Dtype::I64 => NpyArray::I64(
            body.chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
    })
}

/// Extracts dtype and length from the header dict literal.
fn parse_header(name: &str, header: &str) -> Result<(Dtype, usize), EmbeddingError> {
    let descr = dict_value(header, "descr")
        .map(|v| v.trim_matches(|c| c == '\'' || c == '"'))
        .ok_or_else(|| unsupported(name, "header has no descr"))?;
    let dtype = Dtype::parse(descr)
        .ok_or_else(|| unsupported(name, format!("dtype {descr} not supported")))?;

    if dict_value(header, "fortran_order") != Some("False") {
        return Err(unsupported(name, "fortran order not supported"));
    }

    let shape = header
        .find("'shape'")
        .and_then(|start| {
            let rest = &header[start..];
            let open = rest.find('(')?;
            let close = rest.find(')')?;
            Some(&rest[open + 1..close])
        })
        .ok_or_else(|| unsupported(name, "header has no shape"))?;
    let dims: Vec<&str> = shape
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    let len = match dims.as_slice() {
        [len] => len
            .parse()
            .map_err(|_| unsupported(name, format!("invalid shape ({shape})")))?,
        _ => return Err(unsupported(name, format!("expected one dimension, got ({shape})"))),
    };

    Ok((dtype, len))
}

/// Value of a scalar key in the header dict, without surrounding spaces.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let quoted = format!("'{key}'");
    let start = header.find(&quoted)? + quoted.len();
    let rest = header[start..].trim_start().strip_prefix(':')?;
    let end = rest.find(',').unwrap_or(rest.len());
    Some(rest[..end].trim())
}

// =============================================================================
// Encoding
// =============================================================================

/// Element types that can be encoded.
pub trait NpyElement: Copy {
    const DESCR: &'static str;
    fn extend_le(self, out: &mut Vec<u8>);
}

impl NpyElement for f32 {
    const DESCR: &'static str = "<f4";
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NpyElement for i32 {
    const DESCR: &'static str = "<i4";
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl NpyElement for u32 {
    const DESCR: &'static str = "<u4";
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Encodes a slice as a version 1.0 `.npy` file.
pub fn encode<T: NpyElement>(values: &[T]) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        T::DESCR,
        values.len()
    );
    let preamble = MAGIC.len() + 2 + 2;
    let unpadded = preamble + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut out = Vec::with_capacity(preamble + header.len() + values.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in values {
        value.extend_le(&mut out);
    }
    out
}
