use data_contracts::{CameraParams, DepthMap, PointCloud};

/// Back-project every valid depth pixel into world coordinates.
///
/// `camera` must already match the depth map resolution. Non-finite and
/// non-positive depths are skipped; output order is row-major pixel order.
pub fn back_project(depth: &DepthMap, camera: &CameraParams) -> PointCloud {
    let k = &camera.intrinsic;
    let (fx, fy, cx, cy) = (k[0][0], k[1][1], k[0][2], k[1][2]);
    if fx == 0.0 || fy == 0.0 {
        return PointCloud::default();
    }
    let e = &camera.extrinsic;
    let t = [e[0][3], e[1][3], e[2][3]];

    let mut points = Vec::with_capacity(depth.data.len());
    for y in 0..depth.height {
        for x in 0..depth.width {
            let d = depth.data[y * depth.width + x];
            if !d.is_finite() || d <= 0.0 {
                continue;
            }
            let cam = [
                (x as f32 - cx) * d / fx - t[0],
                (y as f32 - cy) * d / fy - t[1],
                d - t[2],
            ];
            // World = R^T (cam - t).
            let world = [
                e[0][0] * cam[0] + e[1][0] * cam[1] + e[2][0] * cam[2],
                e[0][1] * cam[0] + e[1][1] * cam[1] + e[2][1] * cam[2],
                e[0][2] * cam[0] + e[1][2] * cam[1] + e[2][2] * cam[2],
            ];
            points.push(world);
        }
    }
    PointCloud::new(points)
}

/// Depth hypotheses evenly spaced over `[min, max]`.
pub fn depth_hypotheses(depth_min: f32, depth_max: f32, planes: usize) -> Vec<f32> {
    match planes {
        0 => Vec::new(),
        1 => vec![depth_min],
        n => {
            let step = (depth_max - depth_min) / (n - 1) as f32;
            (0..n).map(|i| depth_min + step * i as f32).collect()
        }
    }
}
