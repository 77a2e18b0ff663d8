//! Keypoint parsing and comparison against reference annotations.

mod comparison;
mod parse;

use thiserror::Error;

use crate::calibration::CalibrationError;

pub use comparison::{
    compare_keypoints, compare_pair_distances, pair_distances_cm, ComparisonThresholds,
    DistanceStatus, KeypointReport, NearestMatch, PairComparison, PointComparison,
};
pub use parse::parse_point;

/// Keypoint errors.
#[derive(Error, Debug)]
pub enum KeypointError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
