//! Coordinate value types shared by the calibration and keypoint modules.

mod point;
mod resolution;

pub use point::{PercentPoint, PixelPoint};
pub use resolution::Resolution;
