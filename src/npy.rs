//! Audio tensors from NumPy `.npy` files.
//!
//! Lets the CLI and tests feed the waveform variant without an editor:
//! `np.save("voice.npy", waveform)` on a `[channels, samples]` array is
//! enough. Supported:
//!   - format versions 1.0, 2.0 and 3.0
//!   - little- or big-endian `f4`, `f8` and `i2` (scaled to [-1, 1])
//!   - C order only

use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

use crate::audio::Waveform;

const MAGIC: &[u8] = b"\x93NUMPY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
    I16,
}

impl Dtype {
    fn width(self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::F64 => 8,
            Dtype::I16 => 2,
        }
    }
}

#[derive(Debug, PartialEq)]
struct Header {
    dtype: Dtype,
    big_endian: bool,
    shape: Vec<usize>,
}

/// Decode an `.npy` buffer into its shape and `f32` samples.
pub fn decode_npy(bytes: &[u8]) -> Result<(Vec<usize>, Vec<f32>)> {
    ensure!(
        bytes.len() >= 10 && bytes.starts_with(MAGIC),
        "not an .npy file"
    );

    let (header_len, offset) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            ensure!(bytes.len() >= 12, ".npy header truncated");
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => bail!("unsupported .npy version {v}"),
    };
    let body_start = offset + header_len;
    ensure!(bytes.len() >= body_start, ".npy header truncated");

    let text = std::str::from_utf8(&bytes[offset..body_start]).context(".npy header is not UTF-8")?;
    let header = parse_header(text)?;

    let needed = header
        .shape
        .iter()
        .try_fold(header.dtype.width(), |acc, d| acc.checked_mul(*d))
        .with_context(|| format!(".npy shape {:?} is too large", header.shape))?;
    let body = &bytes[body_start..];
    ensure!(
        body.len() >= needed,
        ".npy body holds {} bytes, shape {:?} needs {}",
        body.len(),
        header.shape,
        needed
    );

    let be = header.big_endian;
    let values = body[..needed]
        .chunks_exact(header.dtype.width())
        .map(|c| match header.dtype {
            Dtype::F32 => {
                let b = [c[0], c[1], c[2], c[3]];
                if be { f32::from_be_bytes(b) } else { f32::from_le_bytes(b) }
            }
            Dtype::F64 => {
                let b = [c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]];
                (if be { f64::from_be_bytes(b) } else { f64::from_le_bytes(b) }) as f32
            }
            Dtype::I16 => {
                let b = [c[0], c[1]];
                let s = if be { i16::from_be_bytes(b) } else { i16::from_le_bytes(b) };
                s as f32 / 32_768.0
            }
        })
        .collect();

    Ok((header.shape, values))
}

/// Load a waveform tensor saved with `np.save`.
pub fn load_waveform(path: &Path, sample_rate: u32) -> Result<Waveform> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let (shape, data) =
        decode_npy(&bytes).with_context(|| format!("Cannot decode {}", path.display()))?;
    Ok(Waveform::new(data, shape, sample_rate))
}

// The header is a Python dict literal, e.g.
// {'descr': '<f4', 'fortran_order': False, 'shape': (2, 16000), }
fn parse_header(text: &str) -> Result<Header> {
    let descr = dict_value(text, "descr").context(".npy header has no 'descr'")?;
    let descr = descr.trim_matches(|c| c == '\'' || c == '"');
    let (big_endian, code) = match descr.strip_prefix('>') {
        Some(code) => (true, code),
        None => (false, descr.trim_start_matches(['<', '=', '|'])),
    };
    let dtype = match code {
        "f4" => Dtype::F32,
        "f8" => Dtype::F64,
        "i2" => Dtype::I16,
        other => bail!("unsupported .npy dtype '{other}'"),
    };

    if dict_value(text, "fortran_order").is_some_and(|v| v == "True") {
        bail!("Fortran-ordered arrays are not supported");
    }

    let shape_text = dict_value(text, "shape").context(".npy header has no 'shape'")?;
    let shape = shape_text
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<usize>().with_context(|| format!("bad dimension '{d}'")))
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        dtype,
        big_endian,
        shape,
    })
}

fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let at = text
        .find(&format!("'{key}'"))
        .or_else(|| text.find(&format!("\"{key}\"")))?;
    let rest = text[at + key.len() + 2..].trim_start().strip_prefix(':')?.trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')')? + 1
    } else if let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"') {
        rest[1..].find(quote)? + 2
    } else {
        rest.find([',', '}']).unwrap_or(rest.len())
    };
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy(descr: &str, shape: &str, body: &[u8]) -> Vec<u8> {
        let mut header =
            format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_decode_f32_stereo() {
        let body: Vec<u8> = [0.25f32, -0.5, 1.0, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let (shape, data) = decode_npy(&npy("<f4", "(2, 2)", &body)).unwrap();
        assert_eq!(shape, vec![2, 2]);
        assert_eq!(data, vec![0.25, -0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_decode_i16_scaled() {
        let body: Vec<u8> = [16_384i16, -32_768]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let (shape, data) = decode_npy(&npy("<i2", "(2,)", &body)).unwrap();
        assert_eq!(shape, vec![2]);
        assert_eq!(data, vec![0.5, -1.0]);
    }

    #[test]
    fn test_decode_big_endian_f8() {
        let body: Vec<u8> = [0.75f64].iter().flat_map(|v| v.to_be_bytes()).collect();
        let (_, data) = decode_npy(&npy(">f8", "(1, 1, 1)", &body)).unwrap();
        assert_eq!(data, vec![0.75]);
    }

    #[test]
    fn test_rejects_bad_magic_and_dtype() {
        assert!(decode_npy(b"RIFF....WAVE").is_err());
        assert!(decode_npy(&npy("<u1", "(1,)", &[0])).is_err());
    }

    #[test]
    fn test_rejects_short_body() {
        let err = decode_npy(&npy("<f4", "(4,)", &[0; 8])).unwrap_err();
        assert!(err.to_string().contains("needs 16"), "{err}");
    }

    #[test]
    fn test_rejects_oversized_shape() {
        let err = decode_npy(&npy("<f4", "(65536, 65536, 65536, 65536)", &[0; 8])).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn test_load_waveform_feeds_planar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.npy");
        let body: Vec<u8> = [0.1f32; 6].iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(&path, npy("<f4", "(1, 2, 3)", &body)).unwrap();

        let waveform = load_waveform(&path, 16_000).unwrap();
        let planar = waveform.to_planar().unwrap();
        assert_eq!((planar.channels, planar.samples), (2, 3));
    }
}
