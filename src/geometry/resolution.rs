//! Frame resolutions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(width, height)` pixel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Live webcam feed the dashboard records annotations against.
    pub const WEBCAM_1080P: Resolution = Resolution::new(1920, 1080);

    /// Native sensor resolution of the reference annotation camera.
    pub const NATIVE_REFERENCE: Resolution = Resolution::new(5488, 3672);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::WEBCAM_1080P
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
