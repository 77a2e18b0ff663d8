//! Calibration records and the "one active calibration" collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::converter::{CalibrationConverter, CalibrationError, CalibrationScale, Result};
use crate::geometry::{PercentPoint, PixelPoint, Resolution};

/// A stored camera calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub name: String,
    pub pixels_per_cm: f64,
    pub reference_length_cm: f64,
    pub pixel_distance: u64,
    /// The two ruler marks, in percentage space.
    pub calibration_points: [PercentPoint; 2],
    pub capture_resolution: Resolution,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// `camera_calibration.json` payload read by the measurement system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationExport {
    pub pixels_per_cm: f64,
    pub reference_length_cm: f64,
    pub pixel_distance: u64,
    /// The calibration points in capture pixels, rounded.
    pub calibration_points: Vec<[i64; 2]>,
    pub resolution: Resolution,
    pub calibration_date: String,
}

impl CameraCalibration {
    /// Create an inactive calibration from two ruler marks.
    pub fn new(
        name: impl Into<String>,
        point_a: PercentPoint,
        point_b: PercentPoint,
        reference_length_cm: f64,
        capture_resolution: Resolution,
    ) -> Result<Self> {
        let scale = CalibrationConverter::compute_scale(
            point_a,
            point_b,
            reference_length_cm,
            capture_resolution,
        )?;

        Ok(Self {
            name: name.into(),
            pixels_per_cm: scale.pixels_per_cm,
            reference_length_cm,
            pixel_distance: scale.pixel_distance,
            calibration_points: [point_a, point_b],
            capture_resolution,
            is_active: false,
            created_at: Utc::now(),
        })
    }

    /// Overwrite the ratio with a manually entered value, keeping the points.
    pub fn set_pixels_per_cm(&mut self, pixels_per_cm: f64) -> Result<()> {
        let scale = CalibrationScale::from_pixels_per_cm(pixels_per_cm, self.reference_length_cm)?;
        self.pixels_per_cm = scale.pixels_per_cm;
        self.pixel_distance = scale.pixel_distance;
        Ok(())
    }

    /// Recompute the ratio from the stored percentage points.
    ///
    /// Repairs records whose ratio was computed from percentages treated as pixels.
    pub fn recompute(&mut self) -> Result<()> {
        let [a, b] = self.calibration_points;
        let scale = CalibrationConverter::compute_scale(
            a,
            b,
            self.reference_length_cm,
            self.capture_resolution,
        )?;
        if (scale.pixels_per_cm - self.pixels_per_cm).abs() > f64::EPSILON {
            tracing::info!(
                "Recomputed calibration '{}': {:.4} -> {:.4} px/cm",
                self.name,
                self.pixels_per_cm,
                scale.pixels_per_cm
            );
        }
        self.pixels_per_cm = scale.pixels_per_cm;
        self.pixel_distance = scale.pixel_distance;
        Ok(())
    }

    pub fn scale(&self) -> CalibrationScale {
        CalibrationScale {
            pixels_per_cm: self.pixels_per_cm,
            pixel_distance: self.pixel_distance,
            reference_length_cm: self.reference_length_cm,
        }
    }

    /// Build the payload written next to exported annotations.
    pub fn measurement_system_format(&self) -> Result<CalibrationExport> {
        let calibration_points = self
            .calibration_points
            .iter()
            .map(|p| {
                CalibrationConverter::percentage_to_pixels(*p, self.capture_resolution)
                    .map(|px: PixelPoint| px.rounded())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CalibrationExport {
            pixels_per_cm: self.pixels_per_cm,
            reference_length_cm: self.reference_length_cm,
            pixel_distance: self.pixel_distance,
            calibration_points,
            resolution: self.capture_resolution,
            calibration_date: self.created_at.to_rfc3339(),
        })
    }
}

/// A collection of calibrations with at most one active entry.
///
/// Stored files are normalised on load: entries are re-inserted in file
/// order, so the last active entry wins and duplicate names collapse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredCalibrations")]
pub struct CalibrationSet {
    calibrations: Vec<CameraCalibration>,
}

#[derive(Deserialize)]
struct StoredCalibrations {
    #[serde(default)]
    calibrations: Vec<CameraCalibration>,
}

impl From<StoredCalibrations> for CalibrationSet {
    fn from(stored: StoredCalibrations) -> Self {
        let active_count = stored.calibrations.iter().filter(|c| c.is_active).count();
        if active_count > 1 {
            tracing::warn!(
                "Calibration file marks {} entries active, keeping the last",
                active_count
            );
        }
        let mut set = Self::new();
        for calibration in stored.calibrations {
            set.insert(calibration);
        }
        set
    }
}

impl CalibrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calibration, replacing any with the same name.
    ///
    /// An active calibration deactivates all others. A replacement keeps the
    /// active flag of the record it replaces.
    pub fn insert(&mut self, mut calibration: CameraCalibration) {
        if self
            .calibrations
            .iter()
            .any(|c| c.name == calibration.name && c.is_active)
        {
            calibration.is_active = true;
        }
        if calibration.is_active {
            for existing in &mut self.calibrations {
                existing.is_active = false;
            }
        }
        self.calibrations.retain(|c| c.name != calibration.name);
        self.calibrations.push(calibration);
    }

    /// Make `name` the active calibration.
    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if !self.calibrations.iter().any(|c| c.name == name) {
            return Err(CalibrationError::InvalidArgument(format!(
                "no calibration named '{}'",
                name
            )));
        }
        for calibration in &mut self.calibrations {
            calibration.is_active = calibration.name == name;
        }
        tracing::info!("Active calibration set to '{}'", name);
        Ok(())
    }

    pub fn active(&self) -> Option<&CameraCalibration> {
        self.calibrations.iter().find(|c| c.is_active)
    }

    pub fn active_mut(&mut self) -> Option<&mut CameraCalibration> {
        self.calibrations.iter_mut().find(|c| c.is_active)
    }

    pub fn get(&self, name: &str) -> Option<&CameraCalibration> {
        self.calibrations.iter().find(|c| c.name == name)
    }

    /// Calibrations, newest first.
    pub fn by_newest(&self) -> Vec<&CameraCalibration> {
        let mut all: Vec<_> = self.calibrations.iter().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn len(&self) -> usize {
        self.calibrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calibrations.is_empty()
    }
}
