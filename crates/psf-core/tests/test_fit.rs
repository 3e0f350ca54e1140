use approx::assert_abs_diff_eq;

use psf_core::analysis::{analyze_frame, PeakMetrics};
use psf_core::consts::FWHM_NOT_POSSIBLE;
use psf_core::fit::{FitEngine, FitSettings, GaussianModel};
use psf_core::frame::FrameGeometry;
use psf_core::profile::ClampedLine;
use psf_core::roi::Roi;

#[allow(dead_code)]
mod common;

fn sampled_line(model: &GaussianModel, n: usize) -> ClampedLine {
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y = x.iter().map(|&xi| model.value(xi)).collect();
    ClampedLine { x, y }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[test]
fn test_recovers_exact_gaussian() {
    let truth = GaussianModel::new(100.0, 5.0, 50.0, 8.0);
    let line = sampled_line(&truth, 100);
    let engine = FitEngine::default();

    let initial = engine.initial_guess(&line.y);
    assert_eq!(initial.mean, 50.0);
    assert_abs_diff_eq!(initial.amplitude, 105.0, epsilon = 1e-9);

    let report = engine.fit(&line, initial).unwrap();
    assert!(report.model.is_finite());
    assert_abs_diff_eq!(report.model.mean, 50.0, epsilon = 1e-3);
    assert_abs_diff_eq!(report.model.fwhm(), 18.838_560_36, epsilon = 1e-3);
    assert_abs_diff_eq!(report.model.baseline, 5.0, epsilon = 1e-2);
    assert_abs_diff_eq!(report.model.amplitude, 100.0, epsilon = 1e-2);
    assert!(report.evaluations > 0);
}

#[test]
fn test_fit_off_center_peak() {
    let truth = GaussianModel::new(40.0, 2.0, 23.5, 3.0);
    let line = sampled_line(&truth, 60);
    let engine = FitEngine::default();
    let report = engine.fit(&line, engine.initial_guess(&line.y)).unwrap();
    assert_abs_diff_eq!(report.model.mean, 23.5, epsilon = 1e-3);
    assert_abs_diff_eq!(report.model.sigma.abs(), 3.0, epsilon = 1e-3);
}

#[test]
fn test_evaluation_cap_is_not_an_error() {
    let truth = GaussianModel::new(100.0, 5.0, 50.0, 8.0);
    let line = sampled_line(&truth, 100);
    let engine = FitEngine::new(FitSettings {
        max_evaluations: 5,
        ..FitSettings::default()
    });
    let report = engine.fit(&line, engine.initial_guess(&line.y)).unwrap();
    assert!(report.model.is_finite());
}

#[test]
fn test_engine_keeps_settings() {
    let settings = FitSettings {
        max_evaluations: 42,
        ..FitSettings::default()
    };
    let engine = FitEngine::new(settings.clone());
    assert_eq!(engine.settings(), &settings);
    assert_eq!(FitEngine::default().settings().max_evaluations, 10_000);
    assert_eq!(engine.initial_guess(&[1.0, 3.0, 2.0]).baseline, 10.0);
}

#[test]
fn test_empty_line_is_solver_error() {
    let engine = FitEngine::default();
    let initial = engine.initial_guess(&[]);
    assert!(engine.fit(&ClampedLine::default(), initial).is_err());
}

// ---------------------------------------------------------------------------
// Whole-frame analysis
// ---------------------------------------------------------------------------

#[test]
fn test_analyze_frame_reports_peak_and_fwhm() {
    let geometry = FrameGeometry::new(16, 512, 256);
    let truth = common::test_peak();
    let bytes = common::gaussian_frame(512, 256, 16, &truth);

    let output = analyze_frame(&FitEngine::default(), &bytes, &geometry, &Roi::new(50, 50, 400, 800)).unwrap();

    assert!(output.warning.is_none());
    assert!(output.error.is_none());
    assert_eq!(output.line.len(), 400);
    assert_eq!(output.line.x[0], 50.0);
    assert_eq!(output.fit_x.len(), 4000);
    assert_abs_diff_eq!(output.fit_x[10], 51.0, epsilon = 1e-9);
    assert_abs_diff_eq!(output.metrics.peak_position, 250.0, epsilon = 0.05);
    assert_abs_diff_eq!(output.metrics.fwhm, truth.fwhm(), epsilon = 0.1);
}

#[test]
fn test_flat_line_gives_sentinels() {
    let geometry = FrameGeometry::new(8, 64, 16);
    let bytes = vec![42u8; 64 * 16];
    let output = analyze_frame(&FitEngine::default(), &bytes, &geometry, &Roi::new(0, 0, 64, 16)).unwrap();
    assert!(output.metrics.peak_position.is_nan());
    assert_eq!(output.metrics.fwhm, FWHM_NOT_POSSIBLE);
    assert!(output.warning.is_some());
    assert!(output.error.is_none());
    // The seed curve still covers the line, 10 points per sample.
    assert_eq!(output.fit_x.len(), 640);
    assert_eq!(output.fit_y.len(), 640);
}

#[test]
fn test_all_zero_frame_gives_sentinels() {
    let geometry = FrameGeometry::new(16, 32, 8);
    let bytes = vec![0u8; 32 * 8 * 2];
    let output = analyze_frame(&FitEngine::default(), &bytes, &geometry, &Roi::new(0, 0, 32, 8)).unwrap();
    assert!(!output.metrics.peak_detected());
    assert!(!output.metrics.fit_possible());
    assert_eq!(output.line.len(), 32);
    assert_eq!(output.fit_x.len(), 320);
    assert!(output.error.is_none());
}

#[test]
fn test_sentinel_metrics() {
    assert!(PeakMetrics::NOT_FOUND.peak_position.is_nan());
    assert_eq!(PeakMetrics::NOT_FOUND.fwhm, -1.0);

    let diverged = GaussianModel::new(1.0, 0.0, f64::INFINITY, f64::NAN);
    let metrics = PeakMetrics::from_model(&diverged);
    assert!(!metrics.peak_detected());
    assert!(!metrics.fit_possible());
}
