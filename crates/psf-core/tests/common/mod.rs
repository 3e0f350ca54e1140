use std::sync::mpsc;
use std::time::{Duration, Instant};

use psf_core::analysis::AnalysisEvent;
use psf_core::fit::GaussianModel;
use psf_core::frame::{encode_samples, AcquiredFrame, BufferSource, SampleFormat};
use psf_core::io::ser::SER_HEADER_SIZE;

/// Build a SER file header for mono frames.
///
/// `little_endian == false` sets the big-endian flag (1) for 16-bit data.
pub fn build_ser_header(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    little_endian: bool,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    // ColorID = MONO
    buf.extend_from_slice(&0i32.to_le_bytes());
    let le_flag: i32 = if little_endian { 0 } else { 1 };
    buf.extend_from_slice(&le_flag.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope (40 bytes each)
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete little-endian mono SER file with the given frame bytes.
pub fn build_ser_with_frames(width: u32, height: u32, bit_depth: u32, frames: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = build_ser_header(width, height, bit_depth, frames.len(), true);
    for frame in frames {
        buf.extend_from_slice(frame);
    }
    buf
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// Integer samples of a frame whose every row is `model` sampled at the column index.
pub fn gaussian_samples(width: usize, height: usize, model: &GaussianModel) -> Vec<u32> {
    let row: Vec<u32> = (0..width)
        .map(|x| model.value(x as f64).round().max(0.0) as u32)
        .collect();
    row.repeat(height)
}

/// Little-endian frame bytes for [`gaussian_samples`].
pub fn gaussian_frame(width: usize, height: usize, bit_depth: u32, model: &GaussianModel) -> Vec<u8> {
    let format = SampleFormat::from_bit_depth(bit_depth).expect("bit depth");
    encode_samples(&gaussian_samples(width, height, model), format)
}

/// Standard test peak: height 1000 over a baseline of 100, centered at 250.
pub fn test_peak() -> GaussianModel {
    GaussianModel::new(1000.0, 100.0, 250.0, 20.0)
}

/// Single-frame, single-buffer delivery on the processed stream.
pub fn acquired(data: &[u8], bit_depth: u32, width: usize, height: usize) -> AcquiredFrame<'_> {
    AcquiredFrame {
        data,
        bit_depth,
        samples_per_line: width,
        lines_per_frame: height,
        frames_per_buffer: 1,
        buffers_per_volume: 1,
        current_buffer: 0,
        source: BufferSource::Processed,
    }
}

/// Receive events until a `Fwhm` arrives (end of one fit cycle) or `timeout`.
pub fn collect_cycle(rx: &mpsc::Receiver<AnalysisEvent>, timeout: Duration) -> Vec<AnalysisEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                let done = matches!(event, AnalysisEvent::Fwhm(_));
                events.push(event);
                if done {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    events
}

/// Count events of each result kind: (averaged, fitted, peak, fwhm).
pub fn count_results(events: &[AnalysisEvent]) -> (usize, usize, usize, usize) {
    let mut counts = (0, 0, 0, 0);
    for event in events {
        match event {
            AnalysisEvent::AveragedLine { .. } => counts.0 += 1,
            AnalysisEvent::FittedCurve { .. } => counts.1 += 1,
            AnalysisEvent::PeakPosition(_) => counts.2 += 1,
            AnalysisEvent::Fwhm(_) => counts.3 += 1,
            _ => {}
        }
    }
    counts
}
