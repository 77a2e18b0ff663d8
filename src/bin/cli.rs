//! QC Calibration - camera calibration and keypoint checks
//!
//! This is the CLI entry point for the qc-calibrate tool.
//! Run with: cargo run --bin qc-calibrate -- <command>

use anyhow::{bail, Context};
use qc_calibration::annotation::{self, AnnotationBuilder, AnnotationData};
use qc_calibration::keypoints::{self, parse_point};
use qc_calibration::overlay::{self, OverlayOptions};
use qc_calibration::{
    AppSettings, CalibrationConverter, CalibrationScale, CalibrationSet, CameraCalibration,
    PercentPoint, PixelPoint,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: qc-calibrate [--json] <command> [args]

Commands:
  scale <ax,ay> <bx,by> [cm]          Compute a scale from two percentage points
  calibrate <name> <ax,ay> <bx,by> [cm]
                                      Compute, store and activate a calibration
  calibrations                        List stored calibrations
  activate <name>                     Make a stored calibration active
  set-ratio <pixels_per_cm>           Overwrite the active calibration's ratio
  recompute                           Recompute the active ratio from its points
  export-calibration                  Print camera_calibration.json
  pixels <x,y>                        Percentage -> capture -> reference pixels
  distance <a> <b>                    Capture pixel points -> cm
  compare <measured.json> <expected.json>
                                      Compare keypoints and pair distances
  export <percent_points.json>        Print annotation_data.json
  validate <annotation.json>          Check an annotation payload
  overlay <measured.json> <expected.json> <out.png>
                                      Render a keypoint comparison image
  config [--save]                     Show effective settings, optionally persist them";

fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = take_flag(&mut args, "--json");
    let settings = AppSettings::load();

    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "scale" => cmd_scale(&settings, rest, json),
        "calibrate" => cmd_calibrate(&settings, rest, json),
        "calibrations" => cmd_list(&settings, json),
        "activate" => cmd_activate(&settings, rest),
        "set-ratio" => cmd_set_ratio(&settings, rest),
        "recompute" => cmd_recompute(&settings),
        "export-calibration" => cmd_export_calibration(&settings),
        "pixels" => cmd_pixels(&settings, rest, json),
        "distance" => cmd_distance(&settings, rest, json),
        "compare" => cmd_compare(&settings, rest, json),
        "export" => cmd_export(&settings, rest),
        "validate" => cmd_validate(&settings, rest, json),
        "overlay" => cmd_overlay(&settings, rest),
        "config" => cmd_config(&settings, rest, json),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn cmd_scale(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    let (a, b, cm) = ruler_args(settings, args, 0)?;
    let scale = CalibrationConverter::compute_scale(a, b, cm, settings.capture_resolution)?;

    if json {
        return print_json(&scale);
    }
    println!("📏 Calibration at {}", settings.capture_resolution);
    println!("   Pixel distance: {} px", scale.pixel_distance);
    println!("   Reference length: {} cm", scale.reference_length_cm);
    println!("   Scale: {:.4} px/cm", scale.pixels_per_cm);
    let native = scale.rescaled(settings.capture_resolution, settings.reference_resolution)?;
    println!(
        "   Scale at {}: {:.4} px/cm",
        settings.reference_resolution, native.pixels_per_cm
    );
    Ok(())
}

fn cmd_calibrate(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    let name = args.first().context("Missing calibration name")?;
    let (a, b, cm) = ruler_args(settings, args, 1)?;

    let mut calibration = CameraCalibration::new(name, a, b, cm, settings.capture_resolution)?;
    calibration.is_active = true;

    let (path, mut set) = load_calibrations(settings)?;
    set.insert(calibration.clone());
    save_calibrations(&path, &set)?;

    if json {
        return print_json(&calibration);
    }
    println!("✅ Calibration '{}' saved and activated", calibration.name);
    println!("   Pixels per cm: {:.4}", calibration.pixels_per_cm);
    println!("   Pixel distance: {} px", calibration.pixel_distance);
    Ok(())
}

fn cmd_list(settings: &AppSettings, json: bool) -> anyhow::Result<()> {
    let (_, set) = load_calibrations(settings)?;
    if json {
        return print_json(&set.by_newest());
    }
    if set.is_empty() {
        println!("No calibrations stored.");
        return Ok(());
    }
    for cal in set.by_newest() {
        let status = if cal.is_active { "[ACTIVE]" } else { "        " };
        println!("{} {}", status, cal.name);
        println!(
            "         Pixels/cm: {:.4}, Reference: {} cm, Resolution: {}",
            cal.pixels_per_cm, cal.reference_length_cm, cal.capture_resolution
        );
        println!("         Created: {}", cal.created_at.to_rfc3339());
    }
    Ok(())
}

fn cmd_activate(settings: &AppSettings, args: &[String]) -> anyhow::Result<()> {
    let name = args.first().context("Missing calibration name")?;
    let (path, mut set) = load_calibrations(settings)?;
    set.set_active(name)?;
    save_calibrations(&path, &set)?;
    println!("✅ '{}' is now the active calibration", name);
    Ok(())
}

fn cmd_set_ratio(settings: &AppSettings, args: &[String]) -> anyhow::Result<()> {
    let ppcm: f64 = args
        .first()
        .context("Missing pixels_per_cm")?
        .parse()
        .context("Invalid pixels_per_cm")?;
    let (path, mut set) = load_calibrations(settings)?;
    let active = set.active_mut().context("No active calibration")?;
    let before = active.pixels_per_cm;
    active.set_pixels_per_cm(ppcm)?;
    println!("Before: pixels_per_cm = {:.4}", before);
    println!("After:  pixels_per_cm = {:.4}", active.pixels_per_cm);
    save_calibrations(&path, &set)?;
    Ok(())
}

fn cmd_recompute(settings: &AppSettings) -> anyhow::Result<()> {
    let (path, mut set) = load_calibrations(settings)?;
    let active = set.active_mut().context("No active calibration")?;
    active.recompute()?;
    println!(
        "✅ '{}': {:.4} px/cm ({} px)",
        active.name, active.pixels_per_cm, active.pixel_distance
    );
    save_calibrations(&path, &set)?;
    Ok(())
}

fn cmd_export_calibration(settings: &AppSettings) -> anyhow::Result<()> {
    let (_, set) = load_calibrations(settings)?;
    let active = set.active().context("No active calibration")?;
    print_json(&active.measurement_system_format()?)
}

fn cmd_pixels(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    let pct = parse_percent(args.first().context("Missing point")?)?;
    let capture = CalibrationConverter::percentage_to_pixels(pct, settings.capture_resolution)?;
    let reference = CalibrationConverter::rescale_pixels(
        capture,
        settings.capture_resolution,
        settings.reference_resolution,
    )?;

    if json {
        #[derive(Serialize)]
        struct Projection {
            percent: PercentPoint,
            capture: [i64; 2],
            reference: [i64; 2],
        }
        return print_json(&Projection {
            percent: pct,
            capture: capture.rounded(),
            reference: reference.rounded(),
        });
    }
    println!("Percent:   [{:.2}%, {:.2}%]", pct.x, pct.y);
    println!(
        "Capture:   [{:.1}, {:.1}] at {}",
        capture.x, capture.y, settings.capture_resolution
    );
    let [rx, ry] = reference.rounded();
    println!("Reference: [{}, {}] at {}", rx, ry, settings.reference_resolution);
    Ok(())
}

fn cmd_distance(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    if args.len() < 2 {
        bail!("distance needs two points");
    }
    let a = parse_point(&args[0])?;
    let b = parse_point(&args[1])?;
    let scale = active_scale(settings)?;
    let cm = CalibrationConverter::pixel_distance_to_cm(a, b, &scale)?;

    if json {
        return print_json(&serde_json::json!({
            "pixel_distance": a.distance_to(&b),
            "pixels_per_cm": scale.pixels_per_cm,
            "cm": cm,
        }));
    }
    println!("Pixel distance: {:.2} px", a.distance_to(&b));
    println!("Real distance:  {:.2} cm ({:.4} px/cm)", cm, scale.pixels_per_cm);
    Ok(())
}

fn cmd_compare(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    if args.len() < 2 {
        bail!("compare needs <measured.json> <expected.json>");
    }
    let measured = load_keypoint_file(Path::new(&args[0]))?;
    let expected = load_keypoint_file(Path::new(&args[1]))?;
    let thresholds = settings.thresholds;

    let report = keypoints::compare_keypoints(&measured.points, &expected.points, &thresholds);

    // Keypoints are in reference pixels; express the scale there too
    let pairs = match (&expected.target_distances, active_scale(settings)) {
        (Some(expected_cm), Ok(scale)) => {
            let scale =
                scale.rescaled(settings.capture_resolution, settings.reference_resolution)?;
            let measured_cm = match measured.target_distances {
                Some(cm) => cm,
                None => keypoints::pair_distances_cm(&measured.points, &scale)?,
            };
            keypoints::compare_pair_distances(&measured_cm, expected_cm, &thresholds)
        }
        (Some(_), Err(e)) => {
            tracing::warn!("Skipping pair distances: {}", e);
            Vec::new()
        }
        (None, _) => Vec::new(),
    };

    if json {
        return print_json(&serde_json::json!({ "keypoints": report, "pairs": pairs }));
    }

    println!("=== KEYPOINT LOCATION COMPARISON ===\n");
    println!("Point | Expected      | Measured      | Diff (px) | Match?");
    for p in &report.points {
        let [ex, ey] = p.expected.rounded();
        let [mx, my] = p.measured.rounded();
        println!(
            "P{:<4} | [{:4}, {:4}]  | [{:4}, {:4}]  | {:8.1}  | {}",
            p.point,
            ex,
            ey,
            mx,
            my,
            p.displacement_px,
            if p.matched { "✅" } else { "❌" }
        );
    }
    println!("\nExpected points: {}", report.expected_count);
    println!("Measured points: {}", report.measured_count);
    println!("Average displacement: {:.1} px", report.average_displacement_px);
    println!("Maximum displacement: {:.1} px", report.max_displacement_px);
    if !report.mismatched.is_empty() {
        println!(
            "\n⚠️  Mismatched points (>= {} px off): {:?}",
            thresholds.displacement_threshold_px, report.mismatched
        );
    }
    for n in report.nearest.iter().filter(|n| n.reordered) {
        println!(
            "Measured P{} is closest to expected P{} ({:.0} px) ← REORDERED",
            n.measured_point, n.closest_expected, n.distance_px
        );
    }

    if !pairs.is_empty() {
        println!("\n=== PAIR-BY-PAIR COMPARISON ===\n");
        println!("Pair | Points | Expected    | Measured    | Diff     | Match?");
        for p in &pairs {
            println!(
                "{:<4} | {}-{:<3}  | {:8.2} cm | {:8.2} cm | {:5.2} cm | {}",
                p.pair,
                p.points.0,
                p.points.1,
                p.expected_cm,
                p.measured_cm,
                p.difference_cm,
                p.status.emoji()
            );
        }
    }
    Ok(())
}

fn cmd_export(settings: &AppSettings, args: &[String]) -> anyhow::Result<()> {
    let path = args.first().context("Missing percent points file")?;
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let points: Vec<PercentPoint> =
        serde_json::from_str(&content).context("Expected a JSON array of {x, y} points")?;

    let scale = active_scale(settings)?;
    let data = AnnotationBuilder::new(
        settings.capture_resolution,
        settings.reference_resolution,
        scale,
    )
    .build(&points)?;
    print_json(&data)
}

fn cmd_validate(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    let path = args.first().context("Missing annotation file")?;
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let data: AnnotationData = serde_json::from_str(&content).context("Invalid annotation JSON")?;

    let issues = annotation::validate(&data, Some(settings.reference_resolution));
    if json {
        let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
        return print_json(&messages);
    }
    if issues.is_empty() {
        println!(
            "✅ PASSED - {} keypoints, {} target distances",
            data.keypoints.len(),
            data.target_distances.len()
        );
        return Ok(());
    }
    println!("❌ FAILED - Found {} issue(s):", issues.len());
    for issue in &issues {
        println!("   • {}", issue);
    }
    bail!("{} format issue(s)", issues.len());
}

fn cmd_overlay(settings: &AppSettings, args: &[String]) -> anyhow::Result<()> {
    if args.len() < 3 {
        bail!("overlay needs <measured.json> <expected.json> <out.png>");
    }
    let measured = load_keypoint_file(Path::new(&args[0]))?;
    let expected = load_keypoint_file(Path::new(&args[1]))?;

    let img = overlay::render_comparison(
        &measured.points,
        &expected.points,
        settings.reference_resolution,
        &OverlayOptions::default(),
    )?;
    img.save(&args[2])
        .with_context(|| format!("Failed to write {}", args[2]))?;
    println!("✅ Written: {} ({}x{})", args[2], img.width(), img.height());
    Ok(())
}

fn cmd_config(settings: &AppSettings, args: &[String], json: bool) -> anyhow::Result<()> {
    if args.iter().any(|a| a == "--save") {
        let path = settings.save().map_err(anyhow::Error::msg)?;
        println!("✅ Settings saved to {}", path.display());
        return Ok(());
    }
    if json {
        return print_json(settings);
    }
    println!("⚙️  Settings");
    println!("   Capture resolution: {}", settings.capture_resolution);
    println!("   Reference resolution: {}", settings.reference_resolution);
    match settings.pixels_per_cm {
        Some(ppcm) => println!("   Pixels per cm: {:.4} (configured)", ppcm),
        None => println!("   Pixels per cm: from active calibration"),
    }
    println!("   Reference length: {} cm", settings.reference_length_cm);
    println!(
        "   Displacement threshold: {} px",
        settings.thresholds.displacement_threshold_px
    );
    if let Some(path) = settings.calibration_path() {
        println!("   Calibration file: {}", path.display());
    }
    Ok(())
}

/// Keypoints read from either a bare `[[x, y], ...]` array or an annotation payload.
struct KeypointFile {
    points: Vec<PixelPoint>,
    target_distances: Option<std::collections::BTreeMap<u32, f64>>,
}

fn load_keypoint_file(path: &Path) -> anyhow::Result<KeypointFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if let Ok(points) = serde_json::from_str::<Vec<PixelPoint>>(&content) {
        return Ok(KeypointFile {
            points,
            target_distances: None,
        });
    }
    let data: AnnotationData = serde_json::from_str(&content).with_context(|| {
        format!(
            "{} is neither a keypoint array nor an annotation",
            path.display()
        )
    })?;
    let target_distances =
        (!data.target_distances.is_empty()).then(|| data.target_distances.clone());
    Ok(KeypointFile {
        points: data.keypoint_pixels(),
        target_distances,
    })
}

fn load_calibrations(settings: &AppSettings) -> anyhow::Result<(PathBuf, CalibrationSet)> {
    let path = settings
        .calibration_path()
        .context("Cannot determine calibration file location")?;
    let set = match fs::read_to_string(&path) {
        Ok(content) => serde_json::from_str(&content)
            .with_context(|| format!("Invalid calibration file {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CalibrationSet::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    Ok((path, set))
}

fn save_calibrations(path: &Path, set: &CalibrationSet) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(set)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Saved {} calibrations to {}", set.len(), path.display());
    Ok(())
}

fn active_scale(settings: &AppSettings) -> anyhow::Result<CalibrationScale> {
    let (_, set) = load_calibrations(settings)?;
    Ok(settings.resolve_scale(&set)?)
}

fn ruler_args(
    settings: &AppSettings,
    args: &[String],
    offset: usize,
) -> anyhow::Result<(PercentPoint, PercentPoint, f64)> {
    if args.len() < offset + 2 {
        bail!("Expected two percentage points, e.g. 0,50 30,50");
    }
    let a = parse_percent(&args[offset])?;
    let b = parse_percent(&args[offset + 1])?;
    let cm = match args.get(offset + 2) {
        Some(v) => v.parse().context("Invalid reference length")?,
        None => settings.reference_length_cm,
    };
    Ok((a, b, cm))
}

fn parse_percent(text: &str) -> anyhow::Result<PercentPoint> {
    let p = parse_point(text)?;
    Ok(PercentPoint::new(p.x, p.y))
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
