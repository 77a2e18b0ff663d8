// Copyright 2026 MagicQC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # QC Calibration
//!
//! Camera calibration and keypoint-to-centimeter conversion for garment
//! quality control.
//!
//! Operators mark garment keypoints on a live camera view. The marks are
//! stored as percentages of the frame, projected onto the capture resolution
//! to measure distances against a ruler calibration, and onto the reference
//! camera's resolution to compare with a ground-truth annotation.
//!
//! ## Example
//!
//! ```rust
//! use qc_calibration::{CalibrationConverter, PercentPoint, PixelPoint, Resolution};
//!
//! # fn main() -> Result<(), qc_calibration::CalibrationError> {
//! // A 30 cm ruler spanning 30% of a 1920x1080 frame
//! let scale = CalibrationConverter::compute_scale(
//!     PercentPoint::new(0.0, 50.0),
//!     PercentPoint::new(30.0, 50.0),
//!     30.0,
//!     Resolution::WEBCAM_1080P,
//! )?;
//! assert!((scale.pixels_per_cm - 19.2).abs() < 1e-9);
//!
//! let cm = CalibrationConverter::pixel_distance_to_cm(
//!     PixelPoint::new(100.0, 540.0),
//!     PixelPoint::new(292.0, 540.0),
//!     &scale,
//! )?;
//! assert!((cm - 10.0).abs() < 1e-9);
//!
//! // Map a capture-space point onto the reference camera's frame
//! let native = CalibrationConverter::rescale_pixels(
//!     PixelPoint::new(1806.0, 1318.0),
//!     Resolution::WEBCAM_1080P,
//!     Resolution::NATIVE_REFERENCE,
//! )?;
//! assert_eq!(native.rounded(), [5162, 4481]);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod calibration;
pub mod geometry;
pub mod keypoints;
pub mod overlay;
pub mod settings;

pub use annotation::{AnnotationBuilder, AnnotationData, FormatIssue};
pub use calibration::{
    CalibrationConverter, CalibrationError, CalibrationPoint, CalibrationScale, CalibrationSet,
    CameraCalibration,
};
pub use geometry::{PercentPoint, PixelPoint, Resolution};
pub use keypoints::{ComparisonThresholds, KeypointError, KeypointReport};
pub use overlay::{OverlayError, OverlayOptions};
pub use settings::AppSettings;
