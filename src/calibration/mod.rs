//! Camera calibration and pixel/centimeter conversion.

mod converter;
mod record;

pub use converter::{
    CalibrationConverter, CalibrationError, CalibrationPoint, CalibrationScale, Result,
};
pub use record::{CalibrationExport, CalibrationSet, CameraCalibration};
