//! Visual comparison of measured and reference keypoints.

mod render;

pub use render::{encode_png_base64, render_comparison, to_data_url, OverlayError, OverlayOptions};
