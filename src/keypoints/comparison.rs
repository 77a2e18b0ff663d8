//! Comparing dashboard keypoints against a reference annotation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::{CalibrationConverter, CalibrationScale};
use crate::geometry::PixelPoint;

use super::KeypointError;

/// Tolerances used when comparing keypoints and distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonThresholds {
    /// A point displaced by at least this many pixels is a mismatch.
    pub displacement_threshold_px: f64,
    /// A nearest-neighbour match farther than this is flagged as distant.
    pub nearest_match_threshold_px: f64,
    /// Pair distances closer than this match.
    pub distance_match_cm: f64,
    /// Pair distances closer than this are a warning, beyond it a mismatch.
    pub distance_warning_cm: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            displacement_threshold_px: 50.0,
            nearest_match_threshold_px: 100.0,
            distance_match_cm: 1.0,
            distance_warning_cm: 5.0,
        }
    }
}

/// Displacement of one measured point from its expected position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointComparison {
    /// 1-based point number.
    pub point: usize,
    pub expected: PixelPoint,
    pub measured: PixelPoint,
    pub displacement_px: f64,
    pub matched: bool,
}

/// Closest expected point to a measured one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestMatch {
    pub measured_point: usize,
    pub closest_expected: usize,
    pub distance_px: f64,
    pub within_threshold: bool,
    /// The closest expected point has a different number.
    pub reordered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointReport {
    pub points: Vec<PointComparison>,
    pub expected_count: usize,
    pub measured_count: usize,
    pub average_displacement_px: f64,
    pub max_displacement_px: f64,
    /// Point numbers displaced beyond the threshold.
    pub mismatched: Vec<usize>,
    pub nearest: Vec<NearestMatch>,
}

impl KeypointReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && !self.nearest.iter().any(|n| n.reordered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceStatus {
    Match,
    Warning,
    Mismatch,
}

impl DistanceStatus {
    pub fn emoji(&self) -> &'static str {
        match self {
            DistanceStatus::Match => "✅",
            DistanceStatus::Warning => "⚠️",
            DistanceStatus::Mismatch => "❌",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairComparison {
    pub pair: u32,
    /// 1-based point numbers forming the pair.
    pub points: (usize, usize),
    pub expected_cm: f64,
    pub measured_cm: f64,
    pub difference_cm: f64,
    pub status: DistanceStatus,
}

/// Centimeter distance of consecutive point pairs (1-2, 3-4, ...), keyed
/// by 1-based pair number. A trailing unpaired point is ignored.
pub fn pair_distances_cm(
    points: &[PixelPoint],
    scale: &CalibrationScale,
) -> Result<BTreeMap<u32, f64>, KeypointError> {
    let mut distances = BTreeMap::new();
    for (i, pair) in points.chunks_exact(2).enumerate() {
        let cm = CalibrationConverter::pixel_distance_to_cm(pair[0], pair[1], scale)?;
        distances.insert(i as u32 + 1, cm);
    }
    Ok(distances)
}

/// Compare measured keypoints against expected ones, point by point.
///
/// Missing measured points are compared as `[0, 0]`.
pub fn compare_keypoints(
    measured: &[PixelPoint],
    expected: &[PixelPoint],
    thresholds: &ComparisonThresholds,
) -> KeypointReport {
    let points: Vec<PointComparison> = expected
        .iter()
        .enumerate()
        .map(|(i, exp)| {
            let meas = measured.get(i).copied().unwrap_or_default();
            let displacement_px = meas.distance_to(exp);
            PointComparison {
                point: i + 1,
                expected: *exp,
                measured: meas,
                displacement_px,
                matched: displacement_px < thresholds.displacement_threshold_px,
            }
        })
        .collect();

    let total: f64 = points.iter().map(|p| p.displacement_px).sum();
    let average_displacement_px = if points.is_empty() {
        0.0
    } else {
        total / points.len() as f64
    };
    let max_displacement_px = points
        .iter()
        .map(|p| p.displacement_px)
        .fold(0.0, f64::max);
    let mismatched: Vec<usize> = points
        .iter()
        .filter(|p| !p.matched)
        .map(|p| p.point)
        .collect();

    let nearest = measured
        .iter()
        .enumerate()
        .filter_map(|(i, meas)| {
            let (closest, distance_px) = expected
                .iter()
                .enumerate()
                .map(|(j, exp)| (j, meas.distance_to(exp)))
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            Some(NearestMatch {
                measured_point: i + 1,
                closest_expected: closest + 1,
                distance_px,
                within_threshold: distance_px < thresholds.nearest_match_threshold_px,
                reordered: closest != i,
            })
        })
        .collect();

    if !mismatched.is_empty() {
        tracing::warn!(
            "{} of {} keypoints displaced by {} px or more: {:?}",
            mismatched.len(),
            points.len(),
            thresholds.displacement_threshold_px,
            mismatched
        );
    }

    KeypointReport {
        points,
        expected_count: expected.len(),
        measured_count: measured.len(),
        average_displacement_px,
        max_displacement_px,
        mismatched,
        nearest,
    }
}

/// Compare per-pair distances. Pairs missing from `measured` count as 0 cm.
pub fn compare_pair_distances(
    measured: &BTreeMap<u32, f64>,
    expected: &BTreeMap<u32, f64>,
    thresholds: &ComparisonThresholds,
) -> Vec<PairComparison> {
    expected
        .iter()
        .map(|(&pair, &expected_cm)| {
            let measured_cm = measured.get(&pair).copied().unwrap_or(0.0);
            let difference_cm = (measured_cm - expected_cm).abs();
            let status = if difference_cm < thresholds.distance_match_cm {
                DistanceStatus::Match
            } else if difference_cm < thresholds.distance_warning_cm {
                DistanceStatus::Warning
            } else {
                DistanceStatus::Mismatch
            };
            let first = (pair as usize).saturating_sub(1) * 2 + 1;
            PairComparison {
                pair,
                points: (first, first + 1),
                expected_cm,
                measured_cm,
                difference_cm,
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Vec<PixelPoint> {
        [[1806_i64, 1318], [1710, 2024], [3395, 1359], [3465, 2045]]
            .into_iter()
            .map(PixelPoint::from)
            .collect()
    }

    #[test]
    fn test_pair_distances_ignore_trailing_point() {
        let scale = CalibrationScale::from_pixels_per_cm(34.17, 30.0).unwrap();
        let mut points = reference();
        points.push(PixelPoint::new(0.0, 0.0));

        let distances = pair_distances_cm(&points, &scale).unwrap();
        assert_eq!(distances.len(), 2);
        assert!((distances[&1] - 20.85).abs() < 0.01);
        assert!((distances[&2] - 20.18).abs() < 0.01);
    }

    #[test]
    fn test_identical_keypoints_are_clean() {
        let report =
            compare_keypoints(&reference(), &reference(), &ComparisonThresholds::default());
        assert!(report.is_clean());
        assert_eq!(report.max_displacement_px, 0.0);
        assert_eq!(report.average_displacement_px, 0.0);
        assert_eq!(report.nearest.len(), 4);
    }

    #[test]
    fn test_displacement_threshold_is_inclusive() {
        let expected = reference();
        let mut measured = expected.clone();
        measured[1].x += 50.0;
        measured[2].y += 49.0;

        let report = compare_keypoints(&measured, &expected, &ComparisonThresholds::default());
        assert_eq!(report.mismatched, vec![2]);
        assert!((report.max_displacement_px - 50.0).abs() < 1e-9);
        assert!((report.average_displacement_px - 24.75).abs() < 1e-9);
    }

    #[test]
    fn test_missing_measured_points_compare_as_origin() {
        let expected = reference();
        let measured = &expected[..2];
        let report = compare_keypoints(measured, &expected, &ComparisonThresholds::default());
        assert_eq!(report.measured_count, 2);
        assert_eq!(report.mismatched, vec![3, 4]);
        assert_eq!(report.points[2].measured, PixelPoint::new(0.0, 0.0));
        assert_eq!(report.nearest.len(), 2);
    }

    #[test]
    fn test_detects_reordered_points() {
        let expected = reference();
        let mut measured = expected.clone();
        measured.swap(0, 1);

        let report = compare_keypoints(&measured, &expected, &ComparisonThresholds::default());
        assert!(!report.is_clean());
        assert_eq!(report.nearest[0].closest_expected, 2);
        assert!(report.nearest[0].reordered);
        assert!(report.nearest[0].within_threshold);
        assert!(!report.nearest[2].reordered);
    }

    #[test]
    fn test_empty_expected() {
        let report = compare_keypoints(&reference(), &[], &ComparisonThresholds::default());
        assert!(report.points.is_empty());
        assert!(report.nearest.is_empty());
        assert_eq!(report.average_displacement_px, 0.0);
    }

    #[test]
    fn test_pair_distance_status() {
        let expected = BTreeMap::from([(1, 20.85), (2, 20.18), (3, 18.02), (4, 43.88)]);
        let measured = BTreeMap::from([(1, 20.5), (2, 23.0), (3, 30.0)]);

        let pairs = compare_pair_distances(&measured, &expected, &ComparisonThresholds::default());
        let statuses: Vec<_> = pairs.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                DistanceStatus::Match,
                DistanceStatus::Warning,
                DistanceStatus::Mismatch,
                DistanceStatus::Mismatch,
            ]
        );
        assert_eq!(pairs[3].measured_cm, 0.0);
        assert_eq!(pairs[1].points, (3, 4));
    }
}
