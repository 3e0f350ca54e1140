use std::sync::mpsc;

use psf_core::admission::{Admission, FrameAdmissionPolicy, SkipReason};
use psf_core::analysis::{AnalysisEvent, AnalysisParameters};
use psf_core::error::PsfError;
use psf_core::frame::{AcquiredFrame, BufferSource};

#[allow(dead_code)]
mod common;

const W: usize = 8;
const H: usize = 4;

fn policy(nth_buffer: u32) -> (FrameAdmissionPolicy, mpsc::Receiver<AnalysisEvent>) {
    let (tx, rx) = mpsc::channel();
    let params = AnalysisParameters {
        nth_buffer,
        ..AnalysisParameters::default()
    };
    (FrameAdmissionPolicy::new(params, tx), rx)
}

fn frame(data: &[u8]) -> AcquiredFrame<'_> {
    common::acquired(data, 8, W, H)
}

fn reason(admission: Admission) -> Option<SkipReason> {
    admission.skip_reason()
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

#[test]
fn test_decimation_admits_every_nth() {
    let (mut policy, _rx) = policy(3);
    let data = vec![1u8; W * H];
    let admitted: Vec<bool> = (0..7)
        .map(|_| policy.admit(&frame(&data), false).unwrap().is_admitted())
        .collect();
    assert_eq!(admitted, vec![false, false, true, false, false, true, false]);
}

#[test]
fn test_busy_skips_without_counting() {
    let (mut policy, _rx) = policy(3);
    let data = vec![1u8; W * H];
    let admission = policy.admit(&frame(&data), true).unwrap();
    assert_eq!(reason(admission), Some(SkipReason::Busy));
    assert_eq!(policy.decimation_counter(), 0);
}

#[test]
fn test_single_shot_bypasses_busy_and_decimation() {
    let (mut policy, _rx) = policy(10);
    let data = vec![1u8; W * H];

    assert_eq!(policy.admit(&frame(&data), false).unwrap().skip_reason(), Some(SkipReason::Decimated));
    assert_eq!(policy.decimation_counter(), 1);

    policy.request_single_shot();
    match policy.admit(&frame(&data), true).unwrap() {
        Admission::Admitted(staged) => assert!(staged.single_shot),
        Admission::Skipped(r) => panic!("single shot skipped: {r}"),
    }
    assert!(!policy.single_shot_pending());
    assert_eq!(policy.decimation_counter(), 0);

    let admission = policy.admit(&frame(&data), true).unwrap();
    assert_eq!(reason(admission), Some(SkipReason::Busy));
}

#[test]
fn test_paused_until_single_shot() {
    let (tx, _rx) = mpsc::channel();
    let params = AnalysisParameters {
        auto_fetch: false,
        nth_buffer: 1,
        ..AnalysisParameters::default()
    };
    let mut policy = FrameAdmissionPolicy::new(params, tx);
    let data = vec![1u8; W * H];

    assert_eq!(reason(policy.admit(&frame(&data), false).unwrap()), Some(SkipReason::Paused));
    policy.request_single_shot();
    assert!(policy.admit(&frame(&data), false).unwrap().is_admitted());
    assert_eq!(reason(policy.admit(&frame(&data), false).unwrap()), Some(SkipReason::Paused));
}

#[test]
fn test_wrong_source_keeps_single_shot_armed() {
    let (mut policy, _rx) = policy(1);
    let data = vec![1u8; W * H];
    let mut raw = frame(&data);
    raw.source = BufferSource::Raw;

    policy.request_single_shot();
    assert_eq!(reason(policy.admit(&raw, false).unwrap()), Some(SkipReason::WrongSource));
    assert!(policy.single_shot_pending());
    assert!(policy.admit(&frame(&data), false).unwrap().is_admitted());
}

#[test]
fn test_buffer_selection_is_clamped() {
    let (mut policy, _rx) = policy(1);
    policy.params_mut().buffer_index = 7;
    let data = vec![1u8; W * H];

    let mut delivery = frame(&data);
    delivery.buffers_per_volume = 4;
    delivery.current_buffer = 2;
    assert_eq!(reason(policy.admit(&delivery, false).unwrap()), Some(SkipReason::BufferNotSelected));

    // 7 clamps to the last buffer of the volume.
    delivery.current_buffer = 3;
    assert!(policy.admit(&delivery, false).unwrap().is_admitted());

    policy.params_mut().buffer_index = -1;
    delivery.current_buffer = 0;
    assert!(policy.admit(&delivery, false).unwrap().is_admitted());
}

// ---------------------------------------------------------------------------
// Geometry and staging
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_geometry_leaves_staging_untouched() {
    let (mut policy, _rx) = policy(1);
    let data = vec![1u8; W * H];
    let mut bad = frame(&data);
    bad.samples_per_line = 0;

    let err = policy.admit(&bad, false).unwrap_err();
    assert!(matches!(err, PsfError::InvalidGeometry { .. }));
    assert!(!policy.staging().is_allocated());

    bad.samples_per_line = W;
    bad.bit_depth = 40;
    assert!(policy.admit(&bad, false).is_err());
    assert!(!policy.staging().is_allocated());
}

#[test]
fn test_short_buffer_is_rejected() {
    let (mut policy, _rx) = policy(1);
    let data = vec![1u8; W * H - 1];
    let err = policy.admit(&frame(&data), false).unwrap_err();
    assert!(matches!(err, PsfError::BufferTooSmall { .. }));
}

#[test]
fn test_selected_frame_is_copied() {
    let (mut policy, _rx) = policy(1);
    policy.params_mut().frame_index = 1;
    let data: Vec<u8> = (0..3).flat_map(|f| std::iter::repeat(f as u8 + 1).take(W * H)).collect();
    let mut delivery = frame(&data);
    delivery.frames_per_buffer = 3;

    match policy.admit(&delivery, false).unwrap() {
        Admission::Admitted(staged) => assert!(staged.bytes().iter().all(|&b| b == 2)),
        Admission::Skipped(r) => panic!("skipped: {r}"),
    }

    // Out-of-range index clamps to the last frame.
    policy.params_mut().frame_index = 9;
    match policy.admit(&delivery, false).unwrap() {
        Admission::Admitted(staged) => assert!(staged.bytes().iter().all(|&b| b == 3)),
        Admission::Skipped(r) => panic!("skipped: {r}"),
    }
}

#[test]
fn test_held_slots_block_staging() {
    let (mut policy, _rx) = policy(1);
    let data = vec![1u8; W * H];

    let first = policy.admit(&frame(&data), false).unwrap();
    let second = policy.admit(&frame(&data), false).unwrap();
    assert!(first.is_admitted() && second.is_admitted());

    policy.request_single_shot();
    assert_eq!(reason(policy.admit(&frame(&data), false).unwrap()), Some(SkipReason::SlotInUse));
    assert!(policy.single_shot_pending());

    assert!(!policy.staging().is_slot_free(0));
    drop(first);
    assert!(policy.staging().is_slot_free(0));
    assert!(policy.admit(&frame(&data), false).unwrap().is_admitted());
    drop(second);
}

#[test]
fn test_geometry_notices_only_on_change() {
    let (mut policy, rx) = policy(1);
    let data = vec![1u8; 2 * W * H];

    let mut delivery = frame(&data[..W * H]);
    delivery.buffers_per_volume = 5;
    policy.admit(&delivery, false).unwrap();
    let notices: Vec<AnalysisEvent> = rx.try_iter().collect();
    assert_eq!(notices, vec![AnalysisEvent::MaxFrameIndex(0), AnalysisEvent::MaxBufferIndex(4)]);

    policy.admit(&delivery, false).unwrap();
    assert_eq!(rx.try_iter().count(), 0);

    let mut doubled = frame(&data);
    doubled.frames_per_buffer = 2;
    doubled.buffers_per_volume = 5;
    policy.admit(&doubled, false).unwrap();
    let notices: Vec<AnalysisEvent> = rx.try_iter().collect();
    assert_eq!(notices, vec![AnalysisEvent::MaxFrameIndex(1)]);
}
