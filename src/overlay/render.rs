//! Drawing measured keypoints over reference keypoints.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use std::io::Cursor;
use thiserror::Error;

use crate::calibration::{CalibrationConverter, CalibrationError};
use crate::geometry::{PixelPoint, Resolution};

const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
const GRID: Rgb<u8> = Rgb([60, 60, 60]);
const EXPECTED: Rgb<u8> = Rgb([50, 220, 90]);
const MEASURED: Rgb<u8> = Rgb([255, 50, 50]);
const OUTLINE: Rgb<u8> = Rgb([255, 255, 255]);
const DISPLACEMENT: Rgb<u8> = Rgb([255, 255, 0]);

/// Overlay errors.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rendering options.
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// The canvas is downscaled to at most this width.
    pub max_width: u32,
    pub marker_radius: i32,
    /// Grid divisions per axis, 0 for none.
    pub grid_divisions: u32,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            max_width: 1280,
            marker_radius: 6,
            grid_divisions: 4,
        }
    }
}

impl OverlayOptions {
    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_marker_radius(mut self, radius: i32) -> Self {
        self.marker_radius = radius;
        self
    }

    fn canvas_for(&self, resolution: Resolution) -> Resolution {
        if self.max_width == 0 || resolution.width <= self.max_width {
            return resolution;
        }
        let factor = self.max_width as f64 / resolution.width as f64;
        Resolution::new(
            self.max_width,
            ((resolution.height as f64 * factor).round() as u32).max(1),
        )
    }
}

/// Draw expected (green) and measured (red) keypoints, both given in
/// `resolution` pixels, joined point by point with a yellow line.
pub fn render_comparison(
    measured: &[PixelPoint],
    expected: &[PixelPoint],
    resolution: Resolution,
    options: &OverlayOptions,
) -> Result<RgbImage, OverlayError> {
    if !resolution.is_valid() {
        return Err(CalibrationError::InvalidArgument(format!(
            "overlay resolution must have non-zero dimensions, got {}",
            resolution
        ))
        .into());
    }

    let canvas_res = options.canvas_for(resolution);
    let project = |p: &PixelPoint| -> Result<(f32, f32), CalibrationError> {
        let c = CalibrationConverter::rescale_pixels(*p, resolution, canvas_res)?;
        Ok((c.x as f32, c.y as f32))
    };
    let expected: Vec<(f32, f32)> = expected.iter().map(project).collect::<Result<_, _>>()?;
    let measured: Vec<(f32, f32)> = measured.iter().map(project).collect::<Result<_, _>>()?;

    let (width, height) = (canvas_res.width, canvas_res.height);
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

    for i in 1..options.grid_divisions {
        let x_line = (width * i / options.grid_divisions) as i32;
        let y_line = (height * i / options.grid_divisions) as i32;
        draw_filled_rect_mut(&mut img, Rect::at(x_line, 0).of_size(1, height), GRID);
        draw_filled_rect_mut(&mut img, Rect::at(0, y_line).of_size(width, 1), GRID);
    }

    for (exp, meas) in expected.iter().zip(measured.iter()) {
        draw_line_segment_mut(&mut img, *exp, *meas, DISPLACEMENT);
    }

    let radius = options.marker_radius.max(1);
    for &(x, y) in &expected {
        draw_filled_circle_mut(&mut img, (x.round() as i32, y.round() as i32), radius, EXPECTED);
    }
    for &(x, y) in &measured {
        let center = (x.round() as i32, y.round() as i32);
        draw_filled_circle_mut(&mut img, center, radius, MEASURED);
        draw_hollow_circle_mut(&mut img, center, radius + 1, OUTLINE);
    }

    tracing::debug!(
        "Rendered overlay {} for {} expected / {} measured keypoints",
        canvas_res,
        expected.len(),
        measured.len()
    );

    Ok(img)
}

/// PNG-encode and base64 the image.
pub fn encode_png_base64(img: &RgbImage) -> Result<String, OverlayError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

/// `data:image/png;base64,...` form for embedding in a page.
pub fn to_data_url(img: &RgbImage) -> Result<String, OverlayError> {
    Ok(format!("data:image/png;base64,{}", encode_png_base64(img)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_is_downscaled() {
        let img = render_comparison(
            &[PixelPoint::new(1806.0, 1318.0)],
            &[PixelPoint::new(1710.0, 2024.0)],
            Resolution::NATIVE_REFERENCE,
            &OverlayOptions::default().with_max_width(686),
        )
        .unwrap();
        assert_eq!(img.width(), 686);
        assert_eq!(img.height(), 459);
    }

    #[test]
    fn test_markers_are_drawn() {
        let img = render_comparison(
            &[PixelPoint::new(20.0, 20.0)],
            &[PixelPoint::new(80.0, 80.0)],
            Resolution::new(100, 100),
            &OverlayOptions::default(),
        )
        .unwrap();
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(*img.get_pixel(20, 20), MEASURED);
        assert_eq!(*img.get_pixel(80, 80), EXPECTED);
        assert_eq!(*img.get_pixel(90, 10), BACKGROUND);
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let result =
            render_comparison(&[], &[], Resolution::new(0, 10), &OverlayOptions::default());
        assert!(matches!(result, Err(OverlayError::Calibration(_))));
    }

    #[test]
    fn test_data_url() {
        let img = RgbImage::from_pixel(4, 4, BACKGROUND);
        let url = to_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
