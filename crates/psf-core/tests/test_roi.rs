use psf_core::roi::Roi;

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

#[test]
fn test_clamp_inside_frame_is_unchanged() {
    let roi = Roi::new(10, 20, 30, 40);
    assert_eq!(roi.clamped(100, 100), roi);
}

#[test]
fn test_clamp_trims_to_frame() {
    assert_eq!(Roi::new(50, 50, 400, 800).clamped(512, 256), Roi::new(50, 50, 400, 206));
    assert_eq!(Roi::new(-10, -5, 30, 30).clamped(100, 100), Roi::new(0, 0, 20, 25));
}

#[test]
fn test_clamp_is_idempotent() {
    let cases = [
        Roi::new(50, 50, 400, 800),
        Roi::new(-20, 10, 50, -30),
        Roi::new(90, 90, 100, 100),
        Roi::new(500, 500, 10, 10),
        Roi::new(0, 0, 0, 0),
    ];
    for roi in cases {
        let once = roi.clamped(100, 100);
        assert_eq!(once.clamped(100, 100), once, "roi {roi}");
    }
}

#[test]
fn test_negative_extent_matches_normalized() {
    let dragged = Roi::new(100, 80, -50, -30);
    assert_eq!(dragged.normalized(), Roi::new(50, 50, 50, 30));
    assert_eq!(dragged.clamped(200, 200), dragged.normalized().clamped(200, 200));
}

#[test]
fn test_no_overlap_collapses_to_zero() {
    assert_eq!(Roi::new(300, 10, 20, 20).clamped(100, 100), Roi::default());
    assert_eq!(Roi::new(-50, -50, 10, 10).clamped(100, 100), Roi::default());
    assert!(Roi::default().is_empty());
}

#[test]
fn test_column_span_is_inclusive() {
    assert_eq!(Roi::new(50, 0, 400, 10).column_span(), (50, 449));
    assert_eq!(Roi::new(60, 0, -10, 10).column_span(), (50, 59));
}

#[test]
fn test_display() {
    assert_eq!(Roi::new(50, 50, 400, 800).to_string(), "50, 50, 400, 800");
}
