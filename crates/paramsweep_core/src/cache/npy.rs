//! NumPy `.npy` array encoding.
//!
//! Arrays are written as version 1.0 files holding little-endian `f8` data
//! in C order. Reading also accepts version 2.0/3.0 headers, `f4`/`i4`/`i8`
//! element types, either byte order and Fortran-ordered data.

use crate::error::CacheError;
use crate::grid::SweepGrid;

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Serialize `grid` to `.npy` bytes
pub fn encode(grid: &SweepGrid<f64>) -> Vec<u8> {
    let shape = match grid.shape() {
        [] => "()".to_string(),
        [len] => format!("({len},)"),
        dims => {
            let dims: Vec<String> = dims.iter().map(usize::to_string).collect();
            format!("({})", dims.join(", "))
        }
    };
    let mut header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': {shape}, }}");

    // magic + version + u16 length + header + newline, padded to the alignment
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let mut bytes = Vec::with_capacity(MAGIC.len() + 4 + header.len() + grid.len() * 8);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    // Header length is bounded by the rank of the grid and fits in a u16
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in grid.data() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Parse `.npy` bytes into a grid of `f64`
pub fn decode(bytes: &[u8]) -> Result<SweepGrid<f64>, CacheError> {
    let rest = bytes
        .strip_prefix(MAGIC)
        .ok_or_else(|| format_error("missing .npy magic string"))?;
    let (&major, rest) = rest
        .split_first()
        .ok_or_else(|| format_error("truncated version"))?;
    let (_minor, rest) = rest
        .split_first()
        .ok_or_else(|| format_error("truncated version"))?;

    let (header_len, rest) = match major {
        1 => {
            let (len, rest) = split(rest, 2)?;
            (usize::from(u16::from_le_bytes([len[0], len[1]])), rest)
        }
        2 | 3 => {
            let (len, rest) = split(rest, 4)?;
            let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]);
            (
                usize::try_from(len).map_err(|_| format_error("header too large"))?,
                rest,
            )
        }
        other => return Err(format_error(&format!("unsupported version {other}"))),
    };
    let (header, body) = split(rest, header_len)?;
    let header = std::str::from_utf8(header).map_err(|_| format_error("header is not text"))?;

    let descr = Descr::parse(quoted_value(header, "descr")?)?;
    let fortran_order = match raw_value(header, "fortran_order")? {
        v if v.starts_with("True") => true,
        v if v.starts_with("False") => false,
        _ => return Err(format_error("invalid fortran_order")),
    };
    let shape = parse_shape(raw_value(header, "shape")?)?;

    let count: usize = shape.iter().product();
    let needed = count
        .checked_mul(descr.size)
        .ok_or_else(|| format_error("array too large"))?;
    if body.len() < needed {
        return Err(format_error(&format!(
            "expected {needed} bytes of data, found {}",
            body.len()
        )));
    }
    let values: Vec<f64> = body[..needed]
        .chunks_exact(descr.size)
        .map(|chunk| descr.read(chunk))
        .collect();

    let values = if fortran_order && shape.len() > 1 {
        to_c_order(&shape, &values)
    } else {
        values
    };
    SweepGrid::from_data(shape, values).ok_or_else(|| format_error("shape does not match data"))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Float,
    Int,
}

#[derive(Debug, Clone, Copy)]
struct Descr {
    kind: Kind,
    size: usize,
    little_endian: bool,
}

impl Descr {
    fn parse(descr: &str) -> Result<Self, CacheError> {
        let mut chars = descr.chars();
        let little_endian = match chars.next() {
            Some('<') | Some('|') | Some('=') => true,
            Some('>') => false,
            _ => return Err(format_error(&format!("unsupported dtype {descr}"))),
        };
        let kind = match chars.next() {
            Some('f') => Kind::Float,
            Some('i') => Kind::Int,
            _ => return Err(format_error(&format!("unsupported dtype {descr}"))),
        };
        let size: usize = chars
            .as_str()
            .parse()
            .map_err(|_| format_error(&format!("unsupported dtype {descr}")))?;
        match (kind, size) {
            (Kind::Float, 4 | 8) | (Kind::Int, 4 | 8) => Ok(Self {
                kind,
                size,
                little_endian,
            }),
            _ => Err(format_error(&format!("unsupported dtype {descr}"))),
        }
    }

    fn read(&self, chunk: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..self.size].copy_from_slice(chunk);
        if !self.little_endian {
            buf[..self.size].reverse();
        }
        match (self.kind, self.size) {
            (Kind::Float, 8) => f64::from_le_bytes(buf),
            (Kind::Float, _) => f64::from(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            (Kind::Int, 8) => i64::from_le_bytes(buf) as f64,
            (Kind::Int, _) => f64::from(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
        }
    }
}

fn format_error(message: &str) -> CacheError {
    CacheError::Format(message.to_string())
}

fn split(bytes: &[u8], at: usize) -> Result<(&[u8], &[u8]), CacheError> {
    if bytes.len() < at {
        return Err(format_error("truncated header"));
    }
    Ok(bytes.split_at(at))
}

/// Text following `'key':` in the header dictionary
fn raw_value<'a>(header: &'a str, key: &str) -> Result<&'a str, CacheError> {
    let needle = format!("'{key}':");
    let start = header
        .find(&needle)
        .ok_or_else(|| format_error(&format!("header has no `{key}`")))?;
    Ok(header[start + needle.len()..].trim_start())
}

fn quoted_value<'a>(header: &'a str, key: &str) -> Result<&'a str, CacheError> {
    let value = raw_value(header, key)?;
    let value = value
        .strip_prefix('\'')
        .ok_or_else(|| format_error(&format!("`{key}` is not a string")))?;
    let end = value
        .find('\'')
        .ok_or_else(|| format_error(&format!("unterminated `{key}`")))?;
    Ok(&value[..end])
}

fn parse_shape(value: &str) -> Result<Vec<usize>, CacheError> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| format_error("invalid shape"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| dim.trim_end_matches('L').parse().map_err(|_| format_error("invalid shape")))
        .collect()
}

/// Reorder column-major values into row-major order
fn to_c_order(shape: &[usize], values: &[f64]) -> Vec<f64> {
    let mut fortran_strides = vec![1; shape.len()];
    for i in 1..shape.len() {
        fortran_strides[i] = fortran_strides[i - 1] * shape[i - 1];
    }
    SweepGrid::new(shape.to_vec(), 0.0)
        .indices()
        .map(|index| {
            let flat: usize = index.iter().zip(&fortran_strides).map(|(i, s)| i * s).sum();
            values[flat]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned() {
        let grid = SweepGrid::from_data(vec![2, 3], (0..6).map(f64::from).collect()).unwrap();
        let bytes = encode(&grid);
        let header_len = usize::from(u16::from_le_bytes([bytes[8], bytes[9]]));

        assert_eq!((10 + header_len) % HEADER_ALIGN, 0);
        assert_eq!(bytes.len(), 10 + header_len + 6 * 8);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
    }

    #[test]
    fn test_one_dimensional_shape_has_trailing_comma() {
        let bytes = encode(&SweepGrid::from_vec(vec![1.0, 2.0]));
        let header = String::from_utf8_lossy(&bytes[10..]);
        assert!(header.contains("'shape': (2,)"));
    }

    #[test]
    fn test_decode_keeps_nan() {
        let grid = SweepGrid::from_data(vec![2, 2], vec![1.0, f64::NAN, 3.0, 4.0]).unwrap();
        let decoded = decode(&encode(&grid)).unwrap();
        assert!(decoded.bits_eq(&grid));
    }

    #[test]
    fn test_decode_other_dtypes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        let header = "{'descr': '<i4', 'fortran_order': False, 'shape': (3,), }\n";
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        for value in [1i32, -2, 3] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.shape(), &[3]);
        assert_eq!(decoded.data(), &[1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_decode_fortran_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[2, 0]);
        let header = "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 3), }\n";
        bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        // Column-major storage of [[0, 1, 2], [3, 4, 5]]
        for value in [0.0f64, 3.0, 1.0, 4.0, 2.0, 5.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.data(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not an array"), Err(CacheError::Format(_))));

        let grid = SweepGrid::from_vec(vec![1.0, 2.0, 3.0]);
        let bytes = encode(&grid);
        assert!(decode(&bytes[..bytes.len() - 4]).is_err());
    }
}
