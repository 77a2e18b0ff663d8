//! Shared settings for the calibration CLI.
//! Persisted in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{CalibrationError, CalibrationScale, CalibrationSet};
use crate::geometry::Resolution;
use crate::keypoints::ComparisonThresholds;

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Resolution operators annotate at (live camera view)
    pub capture_resolution: Resolution,
    /// Resolution of the reference annotation camera
    pub reference_resolution: Resolution,
    /// Manually configured pixels per cm at capture resolution; overrides the
    /// active calibration when set
    pub pixels_per_cm: Option<f64>,
    /// Ruler length used for new calibrations
    pub reference_length_cm: f64,
    /// Keypoint and distance comparison tolerances
    pub thresholds: ComparisonThresholds,
    /// Calibration store, relative to the config directory unless absolute
    pub calibration_file: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            capture_resolution: Resolution::WEBCAM_1080P,
            reference_resolution: Resolution::NATIVE_REFERENCE,
            pixels_per_cm: None,
            reference_length_cm: 30.0,
            thresholds: ComparisonThresholds::default(),
            calibration_file: "calibrations.json".to_string(),
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "magicqc", "qc-calibration")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, then apply environment overrides.
    pub fn load() -> Self {
        let mut loaded = Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();

        loaded.apply_env(|key| std::env::var(key).ok());
        loaded.backfill();
        loaded
    }

    /// Read a settings file. Missing or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut loaded: Self = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        loaded.backfill();
        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<PathBuf, String> {
        let path = Self::settings_path().ok_or("Cannot determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;
        tracing::info!("Saved settings to {}", path.display());

        Ok(())
    }

    /// Override fields from `QC_*` variables. Unparseable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let parse_u32 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());
        let parse_f64 = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(w) = parse_u32("QC_CAPTURE_WIDTH") {
            self.capture_resolution.width = w;
        }
        if let Some(h) = parse_u32("QC_CAPTURE_HEIGHT") {
            self.capture_resolution.height = h;
        }
        if let Some(w) = parse_u32("QC_REFERENCE_WIDTH") {
            self.reference_resolution.width = w;
        }
        if let Some(h) = parse_u32("QC_REFERENCE_HEIGHT") {
            self.reference_resolution.height = h;
        }
        if let Some(ppcm) = parse_f64("QC_PIXELS_PER_CM") {
            self.pixels_per_cm = Some(ppcm);
        }
        if let Some(px) = parse_f64("QC_DISPLACEMENT_THRESHOLD") {
            self.thresholds.displacement_threshold_px = px;
        }
        if let Some(file) = lookup("QC_CALIBRATION_FILE") {
            self.calibration_file = file;
        }
    }

    // Older config files may carry zeroed fields
    fn backfill(&mut self) {
        let defaults = Self::default();
        if !self.capture_resolution.is_valid() {
            self.capture_resolution = defaults.capture_resolution;
        }
        if !self.reference_resolution.is_valid() {
            self.reference_resolution = defaults.reference_resolution;
        }
        if self.reference_length_cm <= 0.0 {
            self.reference_length_cm = defaults.reference_length_cm;
        }
        if self.calibration_file.is_empty() {
            self.calibration_file = defaults.calibration_file;
        }
    }

    /// Resolved path of the calibration store.
    pub fn calibration_path(&self) -> Option<PathBuf> {
        let path = PathBuf::from(&self.calibration_file);
        if path.is_absolute() {
            Some(path)
        } else {
            Self::config_dir().map(|dir| dir.join(path))
        }
    }

    /// Scale at capture resolution: the configured ratio if set, otherwise
    /// the active calibration rescaled to the capture resolution.
    pub fn resolve_scale(
        &self,
        calibrations: &CalibrationSet,
    ) -> Result<CalibrationScale, CalibrationError> {
        if let Some(ppcm) = self.pixels_per_cm {
            return CalibrationScale::from_pixels_per_cm(ppcm, self.reference_length_cm);
        }

        let active = calibrations.active().ok_or_else(|| {
            CalibrationError::InvalidArgument(
                "no active calibration and no pixels_per_cm set".into(),
            )
        })?;

        if active.capture_resolution == self.capture_resolution {
            Ok(active.scale())
        } else {
            tracing::info!(
                "Rescaling calibration '{}' from {} to {}",
                active.name,
                active.capture_resolution,
                self.capture_resolution
            );
            active
                .scale()
                .rescaled(active.capture_resolution, self.capture_resolution)
        }
    }
}
