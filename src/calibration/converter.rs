//! Conversion between percentage space, capture pixels and reference pixels,
//! and from pixel distances to centimeters.
//!
//! Percentage space is the canonical storage form for annotation points. A
//! point is projected onto whatever resolution the consumer works at:
//!
//! - **percentage -> capture pixels**: the frame the operator clicked on
//!   (typically the 1920x1080 webcam feed)
//! - **capture pixels -> reference pixels**: the higher resolution frame the
//!   reference annotation was authored on
//!
//! Coordinates are never rounded here. [`PixelPoint::rounded`] exists for the
//! reporting boundary only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{PercentPoint, PixelPoint, Resolution};

/// Calibration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Two percentage-space points a known physical distance apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub point_a: PercentPoint,
    pub point_b: PercentPoint,
    pub reference_length_cm: f64,
}

impl CalibrationPoint {
    /// Create a calibration point pair. The reference length must be positive.
    pub fn new(
        point_a: PercentPoint,
        point_b: PercentPoint,
        reference_length_cm: f64,
    ) -> Result<Self> {
        check_reference_length(reference_length_cm)?;
        check_percent(&point_a, "point_a")?;
        check_percent(&point_b, "point_b")?;
        Ok(Self {
            point_a,
            point_b,
            reference_length_cm,
        })
    }

    /// Derive the scale at `capture_resolution`.
    pub fn scale(&self, capture_resolution: Resolution) -> Result<CalibrationScale> {
        CalibrationConverter::compute_scale(
            self.point_a,
            self.point_b,
            self.reference_length_cm,
            capture_resolution,
        )
    }
}

/// Pixels-per-centimeter ratio at one particular resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationScale {
    /// Pixels per centimeter, computed from the unrounded pixel distance.
    pub pixels_per_cm: f64,
    /// Pixel distance between the calibration points, rounded.
    pub pixel_distance: u64,
    /// Physical length the scale was derived from.
    pub reference_length_cm: f64,
}

impl CalibrationScale {
    /// Build a scale from a manually entered ratio.
    pub fn from_pixels_per_cm(pixels_per_cm: f64, reference_length_cm: f64) -> Result<Self> {
        if !pixels_per_cm.is_finite() || pixels_per_cm <= 0.0 {
            return Err(CalibrationError::InvalidArgument(format!(
                "pixels_per_cm must be a positive finite number, got {}",
                pixels_per_cm
            )));
        }
        check_reference_length(reference_length_cm)?;

        Ok(Self {
            pixels_per_cm,
            pixel_distance: (pixels_per_cm * reference_length_cm).round() as u64,
            reference_length_cm,
        })
    }

    /// Expected pixel distance for a physical length.
    pub fn pixels_for_cm(&self, cm: f64) -> f64 {
        self.pixels_per_cm * cm
    }

    /// The same physical scale expressed in another resolution's pixels.
    ///
    /// The ratio follows the width change between `from` and `to`.
    pub fn rescaled(&self, from: Resolution, to: Resolution) -> Result<Self> {
        check_resolution(&from, "from")?;
        check_resolution(&to, "to")?;

        let pixels_per_cm = self.pixels_per_cm * (to.width as f64 / from.width as f64);
        Ok(Self {
            pixels_per_cm,
            pixel_distance: (pixels_per_cm * self.reference_length_cm).round() as u64,
            reference_length_cm: self.reference_length_cm,
        })
    }
}

/// Stateless coordinate conversions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationConverter;

impl CalibrationConverter {
    /// Derive a [`CalibrationScale`] from two percentage points a known
    /// distance apart, at the given capture resolution.
    ///
    /// Two identical points yield `pixels_per_cm == 0`, which is returned as is.
    pub fn compute_scale(
        point_a: PercentPoint,
        point_b: PercentPoint,
        reference_length_cm: f64,
        capture_resolution: Resolution,
    ) -> Result<CalibrationScale> {
        check_reference_length(reference_length_cm)?;

        let pixel_a = Self::percentage_to_pixels(point_a, capture_resolution)?;
        let pixel_b = Self::percentage_to_pixels(point_b, capture_resolution)?;
        let pixel_distance = pixel_a.distance_to(&pixel_b);
        let pixels_per_cm = pixel_distance / reference_length_cm;

        tracing::debug!(
            "Computed scale at {}: {:.2} px over {} cm = {:.4} px/cm",
            capture_resolution,
            pixel_distance,
            reference_length_cm,
            pixels_per_cm
        );

        Ok(CalibrationScale {
            pixels_per_cm,
            pixel_distance: pixel_distance.round() as u64,
            reference_length_cm,
        })
    }

    /// Project a percentage point onto `resolution`. No rounding.
    pub fn percentage_to_pixels(point: PercentPoint, resolution: Resolution) -> Result<PixelPoint> {
        check_resolution(&resolution, "resolution")?;
        check_percent(&point, "point")?;

        Ok(PixelPoint {
            x: (point.x / 100.0) * resolution.width as f64,
            y: (point.y / 100.0) * resolution.height as f64,
        })
    }

    /// Inverse of [`Self::percentage_to_pixels`].
    pub fn pixels_to_percentage(point: PixelPoint, resolution: Resolution) -> Result<PercentPoint> {
        check_resolution(&resolution, "resolution")?;
        check_pixel(&point, "point")?;

        Ok(point.to_percent(resolution))
    }

    /// Linearly map a pixel point from one resolution onto another.
    pub fn rescale_pixels(
        point: PixelPoint,
        from_resolution: Resolution,
        to_resolution: Resolution,
    ) -> Result<PixelPoint> {
        check_resolution(&from_resolution, "from_resolution")?;
        check_resolution(&to_resolution, "to_resolution")?;
        check_pixel(&point, "point")?;

        Ok(PixelPoint {
            x: point.x * (to_resolution.width as f64 / from_resolution.width as f64),
            y: point.y * (to_resolution.height as f64 / from_resolution.height as f64),
        })
    }

    /// Convert the pixel distance between two points into centimeters.
    ///
    /// Both points must be in the resolution the scale was computed at. A
    /// zero scale yields `Infinity` (or `NaN` for coincident points).
    pub fn pixel_distance_to_cm(
        point_a: PixelPoint,
        point_b: PixelPoint,
        scale: &CalibrationScale,
    ) -> Result<f64> {
        check_pixel(&point_a, "point_a")?;
        check_pixel(&point_b, "point_b")?;

        Ok(point_a.distance_to(&point_b) / scale.pixels_per_cm)
    }

    /// Project both percentage points at `capture_resolution`, then convert
    /// their distance to centimeters.
    pub fn percentage_points_to_cm_distance(
        point_a: PercentPoint,
        point_b: PercentPoint,
        capture_resolution: Resolution,
        scale: &CalibrationScale,
    ) -> Result<f64> {
        let pixel_a = Self::percentage_to_pixels(point_a, capture_resolution)?;
        let pixel_b = Self::percentage_to_pixels(point_b, capture_resolution)?;
        Self::pixel_distance_to_cm(pixel_a, pixel_b, scale)
    }

    /// Back-calculate the ratio another system must have used for a pair of
    /// pixel points it reported as `expected_cm` apart.
    pub fn implied_pixels_per_cm(
        point_a: PixelPoint,
        point_b: PixelPoint,
        expected_cm: f64,
    ) -> Result<f64> {
        check_reference_length(expected_cm)?;
        check_pixel(&point_a, "point_a")?;
        check_pixel(&point_b, "point_b")?;

        Ok(point_a.distance_to(&point_b) / expected_cm)
    }
}

fn check_reference_length(cm: f64) -> Result<()> {
    // NaN fails the comparison too
    if !(cm > 0.0) || cm.is_infinite() {
        return Err(CalibrationError::InvalidArgument(format!(
            "reference length must be a positive finite number of cm, got {}",
            cm
        )));
    }
    Ok(())
}

fn check_resolution(resolution: &Resolution, name: &str) -> Result<()> {
    if !resolution.is_valid() {
        return Err(CalibrationError::InvalidArgument(format!(
            "{} must have non-zero dimensions, got {}",
            name, resolution
        )));
    }
    Ok(())
}

fn check_percent(point: &PercentPoint, name: &str) -> Result<()> {
    if !point.is_finite() {
        return Err(CalibrationError::InvalidArgument(format!(
            "{} has non-finite coordinates ({}, {})",
            name, point.x, point.y
        )));
    }
    Ok(())
}

fn check_pixel(point: &PixelPoint, name: &str) -> Result<()> {
    if !point.is_finite() {
        return Err(CalibrationError::InvalidArgument(format!(
            "{} has non-finite coordinates ({}, {})",
            name, point.x, point.y
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_compute_scale_horizontal_ruler() {
        let scale = CalibrationConverter::compute_scale(
            PercentPoint::new(0.0, 50.0),
            PercentPoint::new(30.0, 50.0),
            30.0,
            Resolution::WEBCAM_1080P,
        )
        .unwrap();
        assert_eq!(scale.pixel_distance, 576);
        assert!((scale.pixels_per_cm - 19.2).abs() < EPS);
        assert_eq!(scale.reference_length_cm, 30.0);
    }

    #[test]
    fn test_compute_scale_rejects_non_positive_length() {
        let a = PercentPoint::new(0.0, 50.0);
        let b = PercentPoint::new(30.0, 50.0);
        for length in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result =
                CalibrationConverter::compute_scale(a, b, length, Resolution::WEBCAM_1080P);
            assert!(matches!(result, Err(CalibrationError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_compute_scale_identical_points_gives_zero_scale() {
        let p = PercentPoint::new(40.0, 40.0);
        let scale =
            CalibrationConverter::compute_scale(p, p, 10.0, Resolution::WEBCAM_1080P).unwrap();
        assert_eq!(scale.pixels_per_cm, 0.0);
        assert_eq!(scale.pixel_distance, 0);

        let cm = CalibrationConverter::pixel_distance_to_cm(
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(10.0, 0.0),
            &scale,
        )
        .unwrap();
        assert!(cm.is_infinite());
    }

    #[test]
    fn test_scale_round_trip_returns_reference_length() {
        let a = PercentPoint::new(12.5, 33.3);
        let b = PercentPoint::new(71.25, 48.9);
        let resolution = Resolution::WEBCAM_1080P;
        let scale = CalibrationConverter::compute_scale(a, b, 42.0, resolution).unwrap();
        assert!(scale.pixels_per_cm > 0.0);

        let cm = CalibrationConverter::percentage_points_to_cm_distance(a, b, resolution, &scale)
            .unwrap();
        assert!((cm - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_to_pixels_is_linear() {
        let resolution = Resolution::new(1920, 1080);
        let base =
            CalibrationConverter::percentage_to_pixels(PercentPoint::new(10.0, 20.0), resolution)
                .unwrap();
        let scaled =
            CalibrationConverter::percentage_to_pixels(PercentPoint::new(30.0, 20.0), resolution)
                .unwrap();
        assert!((scaled.x - base.x * 3.0).abs() < EPS);
        assert!((scaled.y - base.y).abs() < EPS);
        assert!((base.x - 192.0).abs() < EPS);
        assert!((base.y - 216.0).abs() < EPS);
    }

    #[test]
    fn test_percentage_to_pixels_rejects_zero_width() {
        let result = CalibrationConverter::percentage_to_pixels(
            PercentPoint::new(10.0, 10.0),
            Resolution::new(0, 1080),
        );
        assert!(matches!(result, Err(CalibrationError::InvalidArgument(_))));
    }

    #[test]
    fn test_percentage_to_pixels_rejects_non_finite() {
        let result = CalibrationConverter::percentage_to_pixels(
            PercentPoint::new(f64::NAN, 10.0),
            Resolution::WEBCAM_1080P,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pixels_to_percentage_inverts_projection() {
        let pct = PercentPoint::new(62.62, 56.26);
        let px = CalibrationConverter::percentage_to_pixels(pct, Resolution::WEBCAM_1080P).unwrap();
        let back =
            CalibrationConverter::pixels_to_percentage(px, Resolution::WEBCAM_1080P).unwrap();
        assert!((back.x - pct.x).abs() < 1e-9);
        assert!((back.y - pct.y).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_webcam_to_native() {
        let native = CalibrationConverter::rescale_pixels(
            PixelPoint::new(1806.0, 1318.0),
            Resolution::WEBCAM_1080P,
            Resolution::NATIVE_REFERENCE,
        )
        .unwrap();
        assert!((native.x - 5162.15).abs() < 0.01);
        assert!((native.y - 4481.2).abs() < 0.01);
    }

    #[test]
    fn test_rescale_round_trip() {
        let p = PixelPoint::new(1202.304, 607.608);
        let a = Resolution::WEBCAM_1080P;
        let b = Resolution::NATIVE_REFERENCE;
        let there = CalibrationConverter::rescale_pixels(p, a, b).unwrap();
        let back = CalibrationConverter::rescale_pixels(there, b, a).unwrap();
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_rejects_zero_dimension() {
        let result = CalibrationConverter::rescale_pixels(
            PixelPoint::new(1.0, 1.0),
            Resolution::new(1920, 0),
            Resolution::NATIVE_REFERENCE,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pixel_distance_to_cm_with_manual_scale() {
        let scale = CalibrationScale::from_pixels_per_cm(11.95, 30.0).unwrap();
        assert_eq!(scale.pixel_distance, 359);

        let cm = CalibrationConverter::pixel_distance_to_cm(
            PixelPoint::new(100.0, 200.0),
            PixelPoint::new(2028.0, 220.0),
            &scale,
        )
        .unwrap();
        assert!((cm - 161.35).abs() < 0.01);
    }

    #[test]
    fn test_pixel_distance_to_cm_rejects_infinite_point() {
        let scale = CalibrationScale::from_pixels_per_cm(10.0, 30.0).unwrap();
        let result = CalibrationConverter::pixel_distance_to_cm(
            PixelPoint::new(f64::INFINITY, 0.0),
            PixelPoint::new(0.0, 0.0),
            &scale,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rescaled_scale_follows_width() {
        let webcam = CalibrationScale::from_pixels_per_cm(11.95, 30.0).unwrap();
        let native = webcam
            .rescaled(Resolution::WEBCAM_1080P, Resolution::NATIVE_REFERENCE)
            .unwrap();
        assert!((native.pixels_per_cm - 34.157).abs() < 1e-3);
        assert_eq!(native.pixel_distance, 1025);
        assert!((native.pixels_for_cm(30.0) - 1024.71).abs() < 0.01);
    }

    #[test]
    fn test_from_pixels_per_cm_rejects_zero() {
        assert!(CalibrationScale::from_pixels_per_cm(0.0, 30.0).is_err());
        assert!(CalibrationScale::from_pixels_per_cm(11.95, 0.0).is_err());
    }

    #[test]
    fn test_implied_pixels_per_cm() {
        let ppcm = CalibrationConverter::implied_pixels_per_cm(
            PixelPoint::new(1806.0, 1318.0),
            PixelPoint::new(1710.0, 2024.0),
            20.8524686252755,
        )
        .unwrap();
        assert!((ppcm - 34.17).abs() < 0.01);
    }

    #[test]
    fn test_calibration_point_requires_positive_length() {
        let a = PercentPoint::new(0.0, 0.0);
        let b = PercentPoint::new(10.0, 0.0);
        assert!(CalibrationPoint::new(a, b, 0.0).is_err());

        let point = CalibrationPoint::new(a, b, 10.0).unwrap();
        let scale = point.scale(Resolution::WEBCAM_1080P).unwrap();
        assert!((scale.pixels_per_cm - 19.2).abs() < EPS);
    }
}
