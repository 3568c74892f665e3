//! NumPy `.npy` decoding into dynamic-rank `f64` arrays.
//!
//! Supports format versions 1.0, 2.0 and 3.0 with boolean, integer and floating point
//! dtypes in either byte order, stored in C or Fortran order. Object arrays (pickled
//! payloads) are rejected.

use crate::error::{LensError, NpyError};
use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

const MAGIC: &[u8] = b"\x93NUMPY";

static DESCR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]+)['"]"#).expect("valid regex"));
static FORTRAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).expect("valid regex")
});
static SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).expect("valid regex"));

/// Read and decode a `.npy` file.
pub fn read_npy(path: &Path) -> Result<ArrayD<f64>, LensError> {
    let bytes = std::fs::read(path)?;
    Ok(decode(&bytes)?)
}

/// Decode the bytes of a `.npy` file.
pub fn decode(bytes: &[u8]) -> Result<ArrayD<f64>, NpyError> {
    if !bytes.starts_with(MAGIC) {
        return Err(NpyError::BadMagic);
    }
    let version = bytes
        .get(6..8)
        .ok_or(NpyError::Truncated { section: "version" })?;
    let (major, minor) = (version[0], version[1]);

    let (header_len, header_start) = match major {
        1 => {
            let len = bytes
                .get(8..10)
                .ok_or(NpyError::Truncated {
                    section: "header length",
                })?;
            (u16::from_le_bytes([len[0], len[1]]) as usize, 10)
        }
        2 | 3 => {
            let len = bytes
                .get(8..12)
                .ok_or(NpyError::Truncated {
                    section: "header length",
                })?;
            (
                u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize,
                12,
            )
        }
        _ => return Err(NpyError::UnsupportedVersion { major, minor }),
    };

    let data_start = header_start + header_len;
    let raw_header = bytes
        .get(header_start..data_start)
        .ok_or(NpyError::Truncated { section: "header" })?;
    let header = std::str::from_utf8(raw_header).map_err(|e| NpyError::header(e.to_string()))?;
    let header = Header::parse(header)?;

    let expected = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| NpyError::header("shape overflows the address space"))?;
    let payload = &bytes[data_start..];
    let needed = expected
        .checked_mul(header.dtype.size)
        .ok_or_else(|| NpyError::header("shape overflows the address space"))?;
    if payload.len() < needed {
        return Err(NpyError::PayloadSize {
            shape: header.shape,
            expected,
            actual: payload.len() / header.dtype.size,
        });
    }

    let values: Vec<f64> = payload[..needed]
        .chunks_exact(header.dtype.size)
        .map(|chunk| header.dtype.read(chunk))
        .collect();

    let shape = IxDyn(&header.shape);
    let array = if header.fortran_order {
        ArrayD::from_shape_vec(shape.f(), values)
    } else {
        ArrayD::from_shape_vec(shape, values)
    };
    array.map_err(|e| NpyError::header(e.to_string()))
}

/// Parsed `.npy` header dictionary.
#[derive(Debug, Clone, PartialEq)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

impl Header {
    fn parse(text: &str) -> Result<Self, NpyError> {
        let descr = DESCR_RE
            .captures(text)
            .map(|c| c[1].to_string())
            .ok_or_else(|| NpyError::header("missing 'descr'"))?;
        let fortran_order = FORTRAN_RE
            .captures(text)
            .map(|c| &c[1] == "True")
            .ok_or_else(|| NpyError::header("missing 'fortran_order'"))?;
        let shape_text = SHAPE_RE
            .captures(text)
            .map(|c| c[1].to_string())
            .ok_or_else(|| NpyError::header("missing 'shape'"))?;

        let shape = shape_text
            .split(',')
            .map(str::trim)
            .filter(|dim| !dim.is_empty())
            .map(|dim| {
                dim.trim_end_matches('L')
                    .parse::<usize>()
                    .map_err(|_| NpyError::header(format!("bad dimension '{dim}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dtype: Dtype::parse(&descr)?,
            fortran_order,
            shape,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    Uint,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: Kind,
    size: usize,
    order: ByteOrder,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        let unsupported = || NpyError::UnsupportedDtype {
            descr: descr.to_string(),
        };
        let mut chars = descr.chars();
        let order = match chars.next() {
            Some('<' | '|' | '=') => ByteOrder::Little,
            Some('>') => ByteOrder::Big,
            _ => return Err(unsupported()),
        };
        let kind = match chars.next() {
            Some('b') => Kind::Bool,
            Some('i') => Kind::Int,
            Some('u') => Kind::Uint,
            Some('f') => Kind::Float,
            _ => return Err(unsupported()),
        };
        let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;
        let valid = match kind {
            Kind::Bool => size == 1,
            Kind::Int | Kind::Uint => matches!(size, 1 | 2 | 4 | 8),
            Kind::Float => matches!(size, 4 | 8),
        };
        if !valid {
            return Err(unsupported());
        }
        Ok(Self { kind, size, order })
    }

    /// Convert one element (exactly `self.size` bytes) to `f64`.
    fn read(&self, chunk: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..self.size].copy_from_slice(chunk);
        if self.order == ByteOrder::Big {
            buf[..self.size].reverse();
        }
        let b = buf;
        match (self.kind, self.size) {
            (Kind::Bool, _) => f64::from(u8::from(b[0] != 0)),
            (Kind::Int, 1) => f64::from(b[0] as i8),
            (Kind::Int, 2) => f64::from(i16::from_le_bytes([b[0], b[1]])),
            (Kind::Int, 4) => f64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            (Kind::Int, _) => i64::from_le_bytes(b) as f64,
            (Kind::Uint, 1) => f64::from(b[0]),
            (Kind::Uint, 2) => f64::from(u16::from_le_bytes([b[0], b[1]])),
            (Kind::Uint, 4) => f64::from(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            (Kind::Uint, _) => u64::from_le_bytes(b) as f64,
            (Kind::Float, 4) => f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            (Kind::Float, _) => f64::from_le_bytes(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_bytes(descr: &str, shape: &[usize], fortran: bool, payload: &[u8]) -> Vec<u8> {
        let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
        let shape_text = if shape.len() == 1 {
            format!("({},)", shape[0])
        } else {
            format!("({})", dims.join(", "))
        };
        let order = if fortran { "True" } else { "False" };
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape_text}, }}");
        let pad = (64 - (10 + header.len() + 1) % 64) % 64;
        header.push_str(&" ".repeat(pad));
        header.push('\n');

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Re-frame a version 1.0 file as `major`.0 with a 4-byte header length.
    fn as_version(v1: &[u8], major: u8) -> Vec<u8> {
        let header_len = u16::from_le_bytes([v1[8], v1[9]]) as u32;
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[major, 0]);
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&v1[10..]);
        out
    }

    fn f64_payload(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_f64_matrix() {
        let bytes = npy_bytes(
            "<f8",
            &[2, 3],
            false,
            &f64_payload(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        );
        let array = decode(&bytes).unwrap();
        assert_eq!(array.shape(), &[2, 3]);
        assert_eq!(array[[1, 0]], 4.0);
        assert_eq!(array[[0, 2]], 3.0);
    }

    #[test]
    fn test_decode_fortran_order() {
        // Column-major: first column is [1, 2].
        let bytes = npy_bytes("<f8", &[2, 2], true, &f64_payload(&[1.0, 2.0, 3.0, 4.0]));
        let array = decode(&bytes).unwrap();
        assert_eq!(array[[0, 0]], 1.0);
        assert_eq!(array[[1, 0]], 2.0);
        assert_eq!(array[[0, 1]], 3.0);
    }

    #[test]
    fn test_decode_f32_and_ints() {
        let payload: Vec<u8> = [0.5f32, -1.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = decode(&npy_bytes("<f4", &[2], false, &payload)).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[0.5, -1.5]);

        let payload: Vec<u8> = [-3i64, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let array = decode(&npy_bytes("<i8", &[2], false, &payload)).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[-3.0, 7.0]);

        let array = decode(&npy_bytes("|u1", &[3], false, &[0, 1, 255])).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[0.0, 1.0, 255.0]);

        let array = decode(&npy_bytes("|b1", &[2], false, &[1, 0])).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn test_decode_big_endian() {
        let payload: Vec<u8> = [2.25f64].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = decode(&npy_bytes(">f8", &[1], false, &payload)).unwrap();
        assert_eq!(array[[0]], 2.25);
    }

    #[test]
    fn test_decode_big_endian_ints() {
        let payload: Vec<u8> = [-2i32, 70000].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = decode(&npy_bytes(">i4", &[2], false, &payload)).unwrap();
        assert_eq!(array.as_slice().unwrap(), &[-2.0, 70000.0]);

        let payload: Vec<u8> = [513u16].iter().flat_map(|v| v.to_be_bytes()).collect();
        let array = decode(&npy_bytes(">u2", &[1], false, &payload)).unwrap();
        assert_eq!(array[[0]], 513.0);
    }

    #[test]
    fn test_decode_versions_2_and_3() {
        let v1 = npy_bytes("<f8", &[2, 2], false, &f64_payload(&[1.0, 2.0, 3.0, 4.0]));
        for major in [2, 3] {
            let bytes = as_version(&v1, major);
            assert_eq!(&bytes[6..8], &[major, 0]);
            let array = decode(&bytes).unwrap();
            assert_eq!(array.shape(), &[2, 2]);
            assert_eq!(array[[1, 1]], 4.0);
        }
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let bytes = npy_bytes("<f8", &[4294967296, 4294967296, 16], false, &[]);
        assert_eq!(
            decode(&bytes),
            Err(NpyError::header("shape overflows the address space"))
        );
    }

    #[test]
    fn test_decode_scalar() {
        let array = decode(&npy_bytes("<f8", &[], false, &f64_payload(&[0.75]))).unwrap();
        assert_eq!(array.ndim(), 0);
        assert_eq!(array.iter().next().copied(), Some(0.75));
    }

    #[test]
    fn test_decode_rank3() {
        let values: Vec<f64> = (0..12).map(f64::from).collect();
        let array = decode(&npy_bytes("<f8", &[2, 3, 2], false, &f64_payload(&values))).unwrap();
        assert_eq!(array.shape(), &[2, 3, 2]);
        assert_eq!(array[[1, 2, 1]], 11.0);
    }

    #[test]
    fn test_rejects_object_arrays() {
        let err = decode(&npy_bytes("|O", &[2], false, &[0; 16])).unwrap_err();
        assert!(matches!(err, NpyError::UnsupportedDtype { .. }));
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert_eq!(decode(b"not numpy at all"), Err(NpyError::BadMagic));
    }

    #[test]
    fn test_rejects_short_payload() {
        let bytes = npy_bytes("<f8", &[4], false, &f64_payload(&[1.0, 2.0]));
        let err = decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            NpyError::PayloadSize {
                shape: vec![4],
                expected: 4,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = npy_bytes("<f8", &[1], false, &f64_payload(&[1.0]));
        bytes[6] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(NpyError::UnsupportedVersion { major: 9, .. })
        ));
    }
}
