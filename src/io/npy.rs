//! NumPy `.npy` reader and writer.
//!
//! Layout (format versions 1.0 / 2.0 / 3.0):
//! ```text
//! magic:        "\x93NUMPY" (6 bytes)
//! version:      major u8, minor u8
//! header_len:   u16 LE (v1) or u32 LE (v2, v3)
//! header:       ASCII Python dict literal, space-padded, '\n'-terminated, e.g.
//!               {'descr': '<f4', 'fortran_order': False, 'shape': (480, 640), }
//! payload:      prod(shape) values
//! ```
//!
//! Only floating-point payloads (`f4`, `f8`, either byte order) are accepted;
//! everything is converted to `f32` in C (row-major) order.
//!
//! Format reference: https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Values reserved up front before any payload is read.
const MAX_PREALLOC: usize = 1 << 24;

/// Errors that can occur when reading or writing `.npy` data.
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a .npy file (bad magic)")]
    BadMagic,

    #[error("unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("malformed .npy header: {0}")]
    Header(String),

    #[error("unsupported dtype '{0}' (expected f4 or f8)")]
    UnsupportedDtype(String),

    #[error("payload holds fewer values than shape {shape:?} requires")]
    Truncated { shape: Vec<usize> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dtype {
    F32(Endian),
    F64(Endian),
}

/// Parsed header fields.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Header {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// A dense n-dimensional `f32` array in C order.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl NpyArray {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

}

/// Read a `.npy` file.
pub fn read_npy(path: &Path) -> Result<NpyArray, NpyError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_npy_from(&mut reader)
}

/// Read a `.npy` stream.
pub fn read_npy_from<R: Read>(reader: &mut R) -> Result<NpyArray, NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };

    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes)?;
    // v3 allows UTF-8; the fields we need are ASCII either way.
    let header_text = String::from_utf8(header_bytes)
        .map_err(|_| NpyError::Header("header is not valid UTF-8".to_string()))?;
    let header = parse_header(&header_text)?;
    let dtype = parse_dtype(&header.descr)?;

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| NpyError::Header(format!("shape {:?} too large", header.shape)))?;
    // The header is untrusted; grow past this as values actually arrive.
    let mut data = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let value = match read_value(reader, dtype) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(NpyError::Truncated {
                    shape: header.shape,
                })
            }
            Err(e) => return Err(e.into()),
        };
        data.push(value);
    }

    if header.fortran_order && header.shape.len() > 1 {
        data = fortran_to_c_order(&data, &header.shape);
    }

    Ok(NpyArray {
        shape: header.shape,
        data,
    })
}

fn read_value<R: Read>(reader: &mut R, dtype: Dtype) -> std::io::Result<f32> {
    Ok(match dtype {
        Dtype::F32(Endian::Little) => reader.read_f32::<LittleEndian>()?,
        Dtype::F32(Endian::Big) => reader.read_f32::<BigEndian>()?,
        Dtype::F64(Endian::Little) => reader.read_f64::<LittleEndian>()? as f32,
        Dtype::F64(Endian::Big) => reader.read_f64::<BigEndian>()? as f32,
    })
}

fn parse_dtype(descr: &str) -> Result<Dtype, NpyError> {
    let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
    let mut chars = descr.chars();
    let endian = match chars.next() {
        Some('<') | Some('|') | Some('=') => Endian::Little,
        Some('>') => Endian::Big,
        _ => return Err(unsupported()),
    };
    match chars.as_str() {
        "f4" => Ok(Dtype::F32(endian)),
        "f8" => Ok(Dtype::F64(endian)),
        _ => Err(unsupported()),
    }
}

/// Parse the dict literal. Tolerates key order and whitespace differences.
fn parse_header(text: &str) -> Result<Header, NpyError> {
    let body = text
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| NpyError::Header(format!("expected a dict literal, got {:?}", text.trim())))?;

    let descr = dict_value(body, "descr")?;
    let descr = descr
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string();

    let fortran_order = match dict_value(body, "fortran_order")?.trim() {
        "True" => true,
        "False" => false,
        other => {
            return Err(NpyError::Header(format!(
                "fortran_order must be True or False, got {other:?}"
            )))
        }
    };

    let shape_text = dict_value(body, "shape")?;
    let shape_inner = shape_text
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| NpyError::Header(format!("shape must be a tuple, got {shape_text:?}")))?;
    let shape = shape_inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpyError::Header(format!("bad shape dimension {s:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        descr,
        fortran_order,
        shape,
    })
}

/// Raw text of the value stored under `key` in a flat dict body.
///
/// Values end at the next top-level comma; commas inside a tuple are kept.
fn dict_value<'a>(body: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let missing = || NpyError::Header(format!("missing key '{key}'"));
    let start = [format!("'{key}'"), format!("\"{key}\"")]
        .iter()
        .find_map(|quoted| body.find(quoted.as_str()).map(|i| i + quoted.len()))
        .ok_or_else(missing)?;
    let rest = body[start..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::Header(format!("expected ':' after '{key}'")))?;

    let mut depth = 0i32;
    for (i, c) in rest.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => return Ok(&rest[..i]),
            _ => {}
        }
    }
    Ok(rest)
}

/// Reorder a column-major buffer into row-major.
fn fortran_to_c_order(data: &[f32], shape: &[usize]) -> Vec<f32> {
    let ndim = shape.len();
    // Column-major strides
    let mut f_strides = vec![1usize; ndim];
    for d in 1..ndim {
        f_strides[d] = f_strides[d - 1] * shape[d - 1];
    }

    let mut out = Vec::with_capacity(data.len());
    let mut index = vec![0usize; ndim];
    for _ in 0..data.len() {
        let offset: usize = index.iter().zip(&f_strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);

        // Advance the C-order multi-index (last axis fastest).
        for d in (0..ndim).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
    out
}

/// Write a little-endian `f4`, C-order, version 1.0 `.npy` file.
pub fn write_npy(path: &Path, shape: &[usize], data: &[f32]) -> Result<(), NpyError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_npy_to(&mut writer, shape, data)?;
    writer.flush()?;
    Ok(())
}

/// Write a `.npy` stream (see [`write_npy`]).
pub fn write_npy_to<W: Write>(writer: &mut W, shape: &[usize], data: &[f32]) -> Result<(), NpyError> {
    let count: usize = shape.iter().product();
    if count != data.len() {
        return Err(NpyError::Header(format!(
            "shape {shape:?} needs {count} values, got {}",
            data.len()
        )));
    }

    let shape_text = match shape {
        [single] => format!("({single},)"),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape_text}, }}");

    // magic + version + u16 length + header + '\n' must be a multiple of 64 bytes.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (64 - unpadded % 64) % 64;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| NpyError::Header("header longer than 65535 bytes".to_string()))?;

    writer.write_all(MAGIC)?;
    writer.write_u8(1)?;
    writer.write_u8(0)?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(header.as_bytes())?;
    for &v in data {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}
