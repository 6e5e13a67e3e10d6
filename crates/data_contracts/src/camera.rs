//! MVSNet-style camera files.
//!
//! ```text
//! extrinsic
//! r11 r12 r13 t1
//! ...            (4 rows)
//!
//! intrinsic
//! fx 0 cx
//! ...            (3 rows)
//!
//! depth_min depth_interval [depth_num [depth_max]]
//! ```

use crate::error::{FormatError, FormatResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// World-to-camera transform.
    pub extrinsic: [[f32; 4]; 4],
    pub intrinsic: [[f32; 3]; 3],
    pub depth_min: f32,
    pub depth_interval: f32,
    pub depth_num: Option<f32>,
    pub depth_max: Option<f32>,
}

impl CameraParams {
    pub fn read(path: &Path) -> FormatResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| FormatError::io(path, e))?;
        Self::parse(&raw).map_err(|(line, msg)| FormatError::Parse {
            path: path.to_path_buf(),
            line,
            msg,
        })
    }

    pub fn write(&self, path: &Path) -> FormatResult<()> {
        fs::write(path, self.to_text()).map_err(|e| FormatError::io(path, e))
    }

    pub fn to_text(&self) -> String {
        let mut out = String::from("extrinsic\n");
        for row in &self.extrinsic {
            let _ = writeln!(out, "{} {} {} {}", row[0], row[1], row[2], row[3]);
        }
        out.push_str("\nintrinsic\n");
        for row in &self.intrinsic {
            let _ = writeln!(out, "{} {} {}", row[0], row[1], row[2]);
        }
        let _ = write!(out, "\n{} {}", self.depth_min, self.depth_interval);
        if let Some(num) = self.depth_num {
            let _ = write!(out, " {num}");
            if let Some(max) = self.depth_max {
                let _ = write!(out, " {max}");
            }
        }
        out.push('\n');
        out
    }

    fn parse(raw: &str) -> Result<Self, (usize, String)> {
        let mut lines = raw
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        expect_keyword(&mut lines, "extrinsic")?;
        let mut extrinsic = [[0.0f32; 4]; 4];
        for row in extrinsic.iter_mut() {
            *row = parse_row(&mut lines)?;
        }
        expect_keyword(&mut lines, "intrinsic")?;
        let mut intrinsic = [[0.0f32; 3]; 3];
        for row in intrinsic.iter_mut() {
            *row = parse_row(&mut lines)?;
        }

        let (line_no, depth_line) = lines
            .next()
            .ok_or((0, "missing depth range line".to_string()))?;
        let depth: Vec<f32> = depth_line
            .split_whitespace()
            .map(str::parse::<f32>)
            .collect::<Result<_, _>>()
            .map_err(|e| (line_no, e.to_string()))?;
        if depth.len() < 2 {
            return Err((line_no, "depth line needs min and interval".to_string()));
        }
        Ok(Self {
            extrinsic,
            intrinsic,
            depth_min: depth[0],
            depth_interval: depth[1],
            depth_num: depth.get(2).copied(),
            depth_max: depth.get(3).copied(),
        })
    }

    /// Depth at the far end of the sweep for `num_planes` hypotheses.
    pub fn resolved_depth_max(&self, num_planes: usize, interval_scale: f32) -> f32 {
        self.depth_max.unwrap_or_else(|| {
            self.depth_min + self.depth_interval * interval_scale * (num_planes.max(1) - 1) as f32
        })
    }

    /// Rescale the intrinsics for an image resized by (`sx`, `sy`).
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        let mut out = self.clone();
        out.intrinsic[0][0] *= sx;
        out.intrinsic[0][2] *= sx;
        out.intrinsic[1][1] *= sy;
        out.intrinsic[1][2] *= sy;
        out
    }

    /// Pack into the `[2, 4, 4]` layout the network consumes: slot 0 is the
    /// extrinsic, slot 1 holds the intrinsic top-left and
    /// `[depth_min, interval, num_planes, depth_max]` on its last row.
    pub fn pack(&self, num_planes: usize, interval_scale: f32) -> [f32; 32] {
        let mut out = [0.0f32; 32];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = self.extrinsic[r][c];
            }
        }
        for r in 0..3 {
            for c in 0..3 {
                out[16 + r * 4 + c] = self.intrinsic[r][c];
            }
        }
        out[28] = self.depth_min;
        out[29] = self.depth_interval * interval_scale;
        out[30] = num_planes as f32;
        out[31] = self.resolved_depth_max(num_planes, interval_scale);
        out
    }

    /// Inverse of [`CameraParams::pack`].
    pub fn unpack(packed: &[f32]) -> FormatResult<Self> {
        if packed.len() != 32 {
            return Err(FormatError::Dimensions(format!(
                "packed camera needs 32 values, got {}",
                packed.len()
            )));
        }
        let mut extrinsic = [[0.0f32; 4]; 4];
        let mut intrinsic = [[0.0f32; 3]; 3];
        for r in 0..4 {
            for c in 0..4 {
                extrinsic[r][c] = packed[r * 4 + c];
            }
        }
        for r in 0..3 {
            for c in 0..3 {
                intrinsic[r][c] = packed[16 + r * 4 + c];
            }
        }
        Ok(Self {
            extrinsic,
            intrinsic,
            depth_min: packed[28],
            depth_interval: packed[29],
            depth_num: Some(packed[30]),
            depth_max: Some(packed[31]),
        })
    }
}

fn expect_keyword<'a, I>(lines: &mut I, keyword: &str) -> Result<(), (usize, String)>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    match lines.next() {
        Some((_, l)) if l.eq_ignore_ascii_case(keyword) => Ok(()),
        Some((n, l)) => Err((n, format!("expected {keyword:?}, found {l:?}"))),
        None => Err((0, format!("missing {keyword:?} section"))),
    }
}

fn parse_row<'a, I, const N: usize>(lines: &mut I) -> Result<[f32; N], (usize, String)>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let (line_no, line) = lines.next().ok_or((0, "truncated matrix".to_string()))?;
    let values: Vec<f32> = line
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<Result<_, _>>()
        .map_err(|e| (line_no, e.to_string()))?;
    values
        .try_into()
        .map_err(|v: Vec<f32>| (line_no, format!("expected {N} values, found {}", v.len())))
}
