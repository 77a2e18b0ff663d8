//! Building the `annotation_data.json` payload for the measurement system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::{CalibrationConverter, CalibrationScale, Result};
use crate::geometry::{PercentPoint, PixelPoint, Resolution};

/// Annotation payload consumed by the measurement system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationData {
    /// Keypoints in reference-resolution pixels.
    pub keypoints: Vec<[i64; 2]>,
    /// Pair distances in cm, keyed by 1-based pair number.
    #[serde(default)]
    pub target_distances: BTreeMap<u32, f64>,
    /// `[x1, y1, x2, y2]` in reference pixels, empty when not set.
    #[serde(default)]
    pub placement_box: Vec<i64>,
    pub annotation_date: DateTime<Utc>,
}

impl AnnotationData {
    pub fn keypoint_pixels(&self) -> Vec<PixelPoint> {
        self.keypoints.iter().copied().map(PixelPoint::from).collect()
    }
}

/// Projects operator percentage points onto the reference frame.
///
/// Points travel percentage -> capture pixels -> reference pixels and are
/// rounded only when written into [`AnnotationData`]. Target distances are
/// measured on the unrounded capture pixels with the capture-resolution scale.
#[derive(Debug, Clone)]
pub struct AnnotationBuilder {
    capture_resolution: Resolution,
    reference_resolution: Resolution,
    scale: CalibrationScale,
    placement_box: Option<(PercentPoint, PercentPoint)>,
    annotation_date: Option<DateTime<Utc>>,
}

impl AnnotationBuilder {
    /// `scale` must have been computed at `capture_resolution`.
    pub fn new(
        capture_resolution: Resolution,
        reference_resolution: Resolution,
        scale: CalibrationScale,
    ) -> Self {
        Self {
            capture_resolution,
            reference_resolution,
            scale,
            placement_box: None,
            annotation_date: None,
        }
    }

    /// Garment placement box given by two opposite corners in percentage space.
    pub fn with_placement_box(
        mut self,
        top_left: PercentPoint,
        bottom_right: PercentPoint,
    ) -> Self {
        self.placement_box = Some((top_left, bottom_right));
        self
    }

    pub fn with_annotation_date(mut self, date: DateTime<Utc>) -> Self {
        self.annotation_date = Some(date);
        self
    }

    /// Project a percentage point all the way to reference pixels, unrounded.
    pub fn to_reference(&self, point: PercentPoint) -> Result<PixelPoint> {
        let capture = CalibrationConverter::percentage_to_pixels(point, self.capture_resolution)?;
        CalibrationConverter::rescale_pixels(
            capture,
            self.capture_resolution,
            self.reference_resolution,
        )
    }

    pub fn build(&self, points: &[PercentPoint]) -> Result<AnnotationData> {
        let capture: Vec<PixelPoint> = points
            .iter()
            .map(|p| CalibrationConverter::percentage_to_pixels(*p, self.capture_resolution))
            .collect::<Result<_>>()?;

        let keypoints = capture
            .iter()
            .map(|p| {
                CalibrationConverter::rescale_pixels(
                    *p,
                    self.capture_resolution,
                    self.reference_resolution,
                )
                .map(|r| r.rounded())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut target_distances = BTreeMap::new();
        for (i, pair) in capture.chunks_exact(2).enumerate() {
            let cm = CalibrationConverter::pixel_distance_to_cm(pair[0], pair[1], &self.scale)?;
            target_distances.insert(i as u32 + 1, cm);
        }

        let placement_box = match self.placement_box {
            Some((a, b)) => {
                let [x1, y1] = self.to_reference(a)?.rounded();
                let [x2, y2] = self.to_reference(b)?.rounded();
                vec![x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]
            }
            None => Vec::new(),
        };

        tracing::debug!(
            "Built annotation with {} keypoints and {} target distances at {}",
            keypoints.len(),
            target_distances.len(),
            self.reference_resolution
        );

        Ok(AnnotationData {
            keypoints,
            target_distances,
            placement_box,
            annotation_date: self.annotation_date.unwrap_or_else(Utc::now),
        })
    }
}
