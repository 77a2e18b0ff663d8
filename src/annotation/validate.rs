//! Format checks for annotation payloads before they are handed to the
//! measurement system.

use thiserror::Error;

use super::AnnotationData;
use crate::geometry::Resolution;

/// A problem found in an annotation payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatIssue {
    #[error("keypoints are empty")]
    EmptyKeypoints,
    #[error("keypoint {0} lies outside the {1} image")]
    KeypointOutOfBounds(usize, Resolution),
    #[error("target distance for pair {0} is not a finite positive number")]
    InvalidTargetDistance(u32),
    #[error("target distance references pair {0}, but only {1} pairs exist")]
    UnknownPair(u32, usize),
    #[error("placement_box must be [x1, y1, x2, y2], got {0} values")]
    PlacementBoxShape(usize),
    #[error("image dimensions not set")]
    MissingDimensions,
}

/// Check `data` against the stored image dimensions.
///
/// An empty `target_distances` map or placement box is allowed; both are set
/// later in the workflow.
pub fn validate(data: &AnnotationData, image: Option<Resolution>) -> Vec<FormatIssue> {
    let mut issues = Vec::new();

    if data.keypoints.is_empty() {
        issues.push(FormatIssue::EmptyKeypoints);
    }

    match image {
        Some(res) if res.is_valid() => {
            for (i, [x, y]) in data.keypoints.iter().enumerate() {
                if *x < 0 || *y < 0 || *x > res.width as i64 || *y > res.height as i64 {
                    issues.push(FormatIssue::KeypointOutOfBounds(i + 1, res));
                }
            }
        }
        _ => issues.push(FormatIssue::MissingDimensions),
    }

    let pairs = data.keypoints.len() / 2;
    for (&pair, &cm) in &data.target_distances {
        if !cm.is_finite() || cm <= 0.0 {
            issues.push(FormatIssue::InvalidTargetDistance(pair));
        }
        if pair == 0 || pair as usize > pairs {
            issues.push(FormatIssue::UnknownPair(pair, pairs));
        }
    }

    if !data.placement_box.is_empty() && data.placement_box.len() != 4 {
        issues.push(FormatIssue::PlacementBoxShape(data.placement_box.len()));
    }

    if !issues.is_empty() {
        tracing::warn!("Annotation has {} format issue(s)", issues.len());
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample() -> AnnotationData {
        AnnotationData {
            keypoints: vec![[1806, 1318], [1710, 2024]],
            target_distances: BTreeMap::from([(1, 20.85)]),
            placement_box: vec![],
            annotation_date: Utc::now(),
        }
    }

    #[test]
    fn test_valid_annotation() {
        assert!(validate(&sample(), Some(Resolution::NATIVE_REFERENCE)).is_empty());
    }

    #[test]
    fn test_missing_dimensions() {
        assert_eq!(validate(&sample(), None), vec![FormatIssue::MissingDimensions]);
        assert_eq!(
            validate(&sample(), Some(Resolution::new(0, 0))),
            vec![FormatIssue::MissingDimensions]
        );
    }

    #[test]
    fn test_collects_every_issue() {
        let mut data = sample();
        data.keypoints.push([6000, 10]);
        data.target_distances.insert(2, f64::NAN);
        data.placement_box = vec![1, 2, 3];

        let issues = validate(&data, Some(Resolution::NATIVE_REFERENCE));
        assert_eq!(
            issues,
            vec![
                FormatIssue::KeypointOutOfBounds(3, Resolution::NATIVE_REFERENCE),
                FormatIssue::InvalidTargetDistance(2),
                FormatIssue::UnknownPair(2, 1),
                FormatIssue::PlacementBoxShape(3),
            ]
        );
    }

    #[test]
    fn test_empty_keypoints() {
        let mut data = sample();
        data.keypoints.clear();
        data.target_distances.clear();
        let issues = validate(&data, Some(Resolution::NATIVE_REFERENCE));
        assert_eq!(issues, vec![FormatIssue::EmptyKeypoints]);
    }
}
