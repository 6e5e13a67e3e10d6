use crate::VizError;
use data_contracts::{DepthMap, PointCloud};
use image::{GrayImage, Luma};
use plotters::prelude::*;
use std::path::Path;

pub const CLOUD_FIGURE_SIZE: (u32, u32) = (800, 640);

/// Depth as 8-bit grayscale, normalised over the finite values. Non-finite pixels
/// and flat maps render black.
pub fn depth_to_gray(depth: &DepthMap) -> GrayImage {
    let range = depth.finite_range();
    GrayImage::from_fn(depth.width as u32, depth.height as u32, |x, y| {
        let v = depth.get(x as usize, y as usize).unwrap_or(f32::NAN);
        let level = match range {
            Some((lo, hi)) if v.is_finite() && hi > lo => ((v - lo) / (hi - lo) * 255.0).round(),
            _ => 0.0,
        };
        Luma([level.clamp(0.0, 255.0) as u8])
    })
}

/// Jet colormap for `t` in 0..1.
pub fn jet(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let channel = |offset: f64| {
        let v = 1.5 - (4.0 * t - offset).abs();
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    RGBColor(channel(3.0), channel(2.0), channel(1.0))
}

/// Every `stride`-th point so at most `max_points` remain, order kept.
pub fn subsample(cloud: &PointCloud, max_points: usize) -> Vec<[f32; 3]> {
    let max_points = max_points.max(1);
    let stride = cloud.len().div_ceil(max_points).max(1);
    cloud.points.iter().step_by(stride).copied().collect()
}

/// 3-D scatter of `points`, elevation (z) on the vertical axis and mapped to colour.
pub fn render_cloud(points: &[[f32; 3]], out: &Path) -> Result<(), VizError> {
    let plot_err = |e: &dyn std::fmt::Display| VizError::Plot {
        path: out.to_path_buf(),
        msg: e.to_string(),
    };
    let bounds = PointCloud::new(points.to_vec()).bounds();

    let root = BitMapBackend::new(out, CLOUD_FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    let Some((lo, hi)) = bounds else {
        root.present().map_err(|e| plot_err(&e))?;
        return Ok(());
    };
    let axis = |i: usize| {
        let (a, b) = (lo[i] as f64, hi[i] as f64);
        let pad = ((b - a) * 0.05).max(1e-3);
        (a - pad)..(b + pad)
    };
    let (xr, yr, zr) = (axis(0), axis(1), axis(2));

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_3d(xr.clone(), zr.clone(), yr.clone())
        .map_err(|e| plot_err(&e))?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    // Bounding box edges stand in for labelled axes.
    let (x0, x1, y0, y1, z0, z1) = (xr.start, xr.end, yr.start, yr.end, zr.start, zr.end);
    let edges = [
        [(x0, z0, y0), (x1, z0, y0)],
        [(x0, z0, y1), (x1, z0, y1)],
        [(x0, z1, y0), (x1, z1, y0)],
        [(x0, z1, y1), (x1, z1, y1)],
        [(x0, z0, y0), (x0, z0, y1)],
        [(x1, z0, y0), (x1, z0, y1)],
        [(x0, z1, y0), (x0, z1, y1)],
        [(x1, z1, y0), (x1, z1, y1)],
        [(x0, z0, y0), (x0, z1, y0)],
        [(x1, z0, y0), (x1, z1, y0)],
        [(x0, z0, y1), (x0, z1, y1)],
        [(x1, z0, y1), (x1, z1, y1)],
    ];
    for edge in edges {
        chart
            .draw_series(LineSeries::new(edge, &BLACK.mix(0.4)))
            .map_err(|e| plot_err(&e))?;
    }

    let (zmin, zspan) = (lo[2] as f64, ((hi[2] - lo[2]) as f64).max(f64::EPSILON));
    chart
        .draw_series(points.iter().map(|p| {
            let (x, y, z) = (p[0] as f64, p[1] as f64, p[2] as f64);
            Circle::new((x, z, y), 1, jet((z - zmin) / zspan).filled())
        }))
        .map_err(|e| plot_err(&e))?;

    root.present().map_err(|e| plot_err(&e))?;
    Ok(())
}
