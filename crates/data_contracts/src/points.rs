use crate::error::{FormatError, FormatResult};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Plain-text point cloud, one `x y z` row per point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<[f32; 3]>,
}

impl PointCloud {
    pub fn new(points: Vec<[f32; 3]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Per-axis (min, max); `None` for an empty cloud.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(mut lo, mut hi), p| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
            (lo, hi)
        }))
    }
}

pub fn write_xyz(path: &Path, cloud: &PointCloud) -> FormatResult<()> {
    let file = fs::File::create(path).map_err(|e| FormatError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for [x, y, z] in &cloud.points {
        writeln!(writer, "{x} {y} {z}").map_err(|e| FormatError::io(path, e))?;
    }
    writer.flush().map_err(|e| FormatError::io(path, e))
}

pub fn read_xyz(path: &Path) -> FormatResult<PointCloud> {
    let file = fs::File::open(path).map_err(|e| FormatError::io(path, e))?;
    let reader = BufReader::new(file);
    let mut points = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| FormatError::io(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values: Vec<f32> = trimmed
            .split_whitespace()
            .map(str::parse::<f32>)
            .collect::<Result<_, _>>()
            .map_err(|e| FormatError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                msg: e.to_string(),
            })?;
        if values.len() != 3 {
            return Err(FormatError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                msg: format!("expected 3 columns, found {}", values.len()),
            });
        }
        points.push([values[0], values[1], values[2]]);
    }
    Ok(PointCloud { points })
}
