//! Basic usage example for QC Calibration.

use qc_calibration::keypoints::{compare_keypoints, ComparisonThresholds};
use qc_calibration::{
    AnnotationBuilder, CalibrationConverter, CameraCalibration, PercentPoint, PixelPoint,
    Resolution,
};

fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    // Calibrate against a 30 cm ruler on the 1920x1080 webcam feed
    let calibration = CameraCalibration::new(
        "bench ruler",
        PercentPoint::new(5.2, 18.5),
        PercentPoint::new(52.8, 20.4),
        30.0,
        Resolution::WEBCAM_1080P,
    )?;
    let scale = calibration.scale();
    println!("📏 {:.4} px/cm at {}", scale.pixels_per_cm, Resolution::WEBCAM_1080P);

    // Operator marks a chest width on the live view
    let left = PercentPoint::new(31.4, 42.0);
    let right = PercentPoint::new(68.9, 42.6);
    let cm = CalibrationConverter::percentage_points_to_cm_distance(
        left,
        right,
        Resolution::WEBCAM_1080P,
        &scale,
    )?;
    println!("👕 Chest width: {:.2} cm", cm);

    // Project the marks onto the reference camera and compare
    let annotation = AnnotationBuilder::new(
        Resolution::WEBCAM_1080P,
        Resolution::NATIVE_REFERENCE,
        scale,
    )
    .build(&[left, right])?;

    let reference = vec![PixelPoint::new(1730.0, 1540.0), PixelPoint::new(3790.0, 1570.0)];
    let report = compare_keypoints(
        &annotation.keypoint_pixels(),
        &reference,
        &ComparisonThresholds::default(),
    );
    println!(
        "🎯 Average displacement {:.1} px, mismatched: {:?}",
        report.average_displacement_px, report.mismatched
    );

    Ok(())
}
