//! Points in percentage space and pixel space.

use serde::{Deserialize, Serialize};

use super::Resolution;

/// A coordinate expressed as a percentage of frame width/height (0-100).
///
/// This is the resolution-independent form operators' clicks are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A coordinate in pixels of some resolution.
///
/// Serializes as `[x, y]`, the keypoint format used by the measurement system.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point in the same resolution.
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Round to whole pixels. Only call this when reporting a result.
    pub fn rounded(&self) -> [i64; 2] {
        [self.x.round() as i64, self.y.round() as i64]
    }

    /// Express this point as a percentage of `resolution`.
    ///
    /// Callers must ensure both dimensions are non-zero; the converter in
    /// [`crate::calibration`] performs that check.
    pub fn to_percent(&self, resolution: Resolution) -> PercentPoint {
        PercentPoint {
            x: self.x / resolution.width as f64 * 100.0,
            y: self.y / resolution.height as f64 * 100.0,
        }
    }
}

impl From<[f64; 2]> for PixelPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<PixelPoint> for [f64; 2] {
    fn from(point: PixelPoint) -> Self {
        [point.x, point.y]
    }
}

impl From<[i64; 2]> for PixelPoint {
    fn from([x, y]: [i64; 2]) -> Self {
        Self {
            x: x as f64,
            y: y as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to() {
        let a = PixelPoint::new(100.0, 200.0);
        let b = PixelPoint::new(2028.0, 220.0);
        assert!((a.distance_to(&b) - 1928.1037).abs() < 1e-3);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_rounded_half_away_from_zero() {
        let p = PixelPoint::new(5160.9, 4480.5);
        assert_eq!(p.rounded(), [5161, 4481]);
    }

    #[test]
    fn test_pixel_point_serializes_as_pair() {
        let p = PixelPoint::new(1806.0, 1318.0);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[1806.0,1318.0]");

        let back: PixelPoint = serde_json::from_str("[229, 1917]").unwrap();
        assert_eq!(back, PixelPoint::new(229.0, 1917.0));
    }

    #[test]
    fn test_to_percent() {
        let p = PixelPoint::new(3465.0, 2045.0);
        let pct = p.to_percent(Resolution::NATIVE_REFERENCE);
        assert!((pct.x - 63.138).abs() < 1e-3);
        assert!((pct.y - 55.692).abs() < 1e-3);
    }
}
