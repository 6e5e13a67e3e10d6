//! Single-channel float raster stored as PFM (`Pf`).
//!
//! Scanlines are written bottom-to-top as the PFM convention requires; the in-memory
//! [`DepthMap`] is always row-major top-to-bottom.

use crate::error::{FormatError, FormatResult};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    pub width: usize,
    pub height: usize,
    /// Row-major, top row first.
    pub data: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> FormatResult<Self> {
        if data.len() != width * height {
            return Err(FormatError::Dimensions(format!(
                "{}x{} depth map needs {} values, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Min/max over finite values; `None` when nothing finite is present.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub fn write_pfm(path: &Path, depth: &DepthMap) -> FormatResult<()> {
    let file = fs::File::create(path).map_err(|e| FormatError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    encode_pfm(&mut writer, depth).map_err(|e| FormatError::io(path, e))?;
    writer.flush().map_err(|e| FormatError::io(path, e))
}

pub fn encode_pfm<W: Write>(writer: &mut W, depth: &DepthMap) -> std::io::Result<()> {
    // Negative scale marks little-endian data.
    write!(writer, "Pf\n{} {}\n-1\n", depth.width, depth.height)?;
    for row in depth.data.chunks(depth.width.max(1)).rev() {
        for v in row {
            writer.write_all(&v.to_le_bytes())?;
        }
    }
    Ok(())
}

pub fn read_pfm(path: &Path) -> FormatResult<DepthMap> {
    let file = fs::File::open(path).map_err(|e| FormatError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let magic = read_header_line(&mut reader, path)?;
    match magic.as_str() {
        "Pf" => {}
        "PF" => {
            return Err(FormatError::Header {
                path: path.to_path_buf(),
                msg: "three-channel PF rasters are not depth maps".to_string(),
            })
        }
        other => {
            return Err(FormatError::Header {
                path: path.to_path_buf(),
                msg: format!("unexpected magic {other:?}"),
            })
        }
    }

    let dims = read_header_line(&mut reader, path)?;
    let mut parts = dims.split_whitespace().map(str::parse::<usize>);
    let (width, height) = match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(w)), Some(Ok(h)), None) => (w, h),
        _ => {
            return Err(FormatError::Header {
                path: path.to_path_buf(),
                msg: format!("bad dimension line {dims:?}"),
            })
        }
    };

    let scale_line = read_header_line(&mut reader, path)?;
    let scale: f32 = scale_line.parse().map_err(|_| FormatError::Header {
        path: path.to_path_buf(),
        msg: format!("bad scale line {scale_line:?}"),
    })?;
    let little_endian = scale < 0.0;

    let Some(expected) = width.checked_mul(height).and_then(|n| n.checked_mul(4)) else {
        return Err(FormatError::Header {
            path: path.to_path_buf(),
            msg: format!("dimensions {width}x{height} overflow the raster size"),
        });
    };
    let mut raw = Vec::new();
    reader
        .read_to_end(&mut raw)
        .map_err(|e| FormatError::io(path, e))?;
    if raw.len() < expected {
        return Err(FormatError::Truncated {
            path: path.to_path_buf(),
            expected,
            found: raw.len(),
        });
    }

    let mut data = vec![0.0f32; width * height];
    for (i, chunk) in raw[..expected].chunks_exact(4).enumerate() {
        let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let v = if little_endian {
            f32::from_le_bytes(bytes)
        } else {
            f32::from_be_bytes(bytes)
        };
        // File rows run bottom-to-top.
        let file_row = i / width;
        let col = i % width;
        data[(height - 1 - file_row) * width + col] = v;
    }
    DepthMap::new(width, height, data)
}

fn read_header_line<R: BufRead>(reader: &mut R, path: &Path) -> FormatResult<String> {
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .map_err(|e| FormatError::io(path, e))?;
    if n == 0 {
        return Err(FormatError::Header {
            path: path.to_path_buf(),
            msg: "unexpected end of header".to_string(),
        });
    }
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(DepthMap::new(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn encoded_rows_are_bottom_up() {
        let depth = DepthMap::new(1, 2, vec![1.0, 2.0]).unwrap();
        let mut buf = Vec::new();
        encode_pfm(&mut buf, &depth).unwrap();
        let header = b"Pf\n1 2\n-1\n";
        assert_eq!(&buf[..header.len()], header);
        let body = &buf[header.len()..];
        assert_eq!(&body[..4], &2.0f32.to_le_bytes());
        assert_eq!(&body[4..], &1.0f32.to_le_bytes());
    }

    #[test]
    fn finite_range_skips_nan() {
        let depth = DepthMap::new(3, 1, vec![f32::NAN, 4.0, 2.0]).unwrap();
        assert_eq!(depth.finite_range(), Some((2.0, 4.0)));
    }
}
