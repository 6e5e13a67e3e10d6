use data_contracts::{CameraParams, DepthMap, PointCloud};

/// Host-side output for one sample. Moved into the result router right after the
/// forward call; nothing else keeps it.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Plane-sweep estimate at the coarsest image scale.
    pub coarse_depth: DepthMap,
    /// One depth map per refinement stage, coarse to fine.
    pub refined_depths: Vec<DepthMap>,
    /// Back-projection of [`Prediction::final_depth`].
    pub point_cloud: PointCloud,
    /// Reference camera rescaled to the final depth resolution.
    pub camera: CameraParams,
}

impl Prediction {
    pub fn final_depth(&self) -> &DepthMap {
        self.refined_depths.last().unwrap_or(&self.coarse_depth)
    }

    /// Tag of the final depth map: `flow{n}` after `n` refinement stages, else `init`.
    pub fn final_tag(&self) -> String {
        match self.refined_depths.len() {
            0 => "init".to_string(),
            n => format!("flow{n}"),
        }
    }
}
