//! Shared data contracts for evaluation artifacts and MVS scan metadata.

pub mod camera;
pub mod depth;
pub mod error;
pub mod pair;
pub mod points;

pub use camera::CameraParams;
pub use depth::{read_pfm, write_pfm, DepthMap};
pub use error::{FormatError, FormatResult};
pub use pair::{read_pair_file, ViewPair};
pub use points::{read_xyz, write_xyz, PointCloud};
