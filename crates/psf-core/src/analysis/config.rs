use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_NTH_BUFFER;
use crate::frame::BufferSource;
use crate::roi::Roi;

/// Buffer index meaning "accept every buffer of the volume".
pub const ANY_BUFFER: i64 = -1;

/// User/session settings read by the analysis core.
///
/// Each fit cycle receives its own copy; updates never mutate a snapshot a
/// cycle is already using.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParameters {
    pub buffer_source: BufferSource,
    pub roi: Roi,
    /// Frame within a multi-frame buffer that gets analyzed.
    pub frame_index: u32,
    /// Buffer within a volume that gets analyzed, -1 for any.
    pub buffer_index: i32,
    /// Analyze every Nth admitted buffer.
    pub nth_buffer: u32,
    pub auto_fetch: bool,
    /// Display-only: let the plot rescale on every update.
    pub auto_scaling: bool,
    /// Display-only: plot intensities on a logarithmic axis.
    pub log_fit_mode: bool,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            buffer_source: BufferSource::Processed,
            roi: Roi::new(50, 50, 400, 800),
            frame_index: 0,
            buffer_index: -1,
            nth_buffer: DEFAULT_NTH_BUFFER,
            auto_fetch: true,
            auto_scaling: true,
            log_fit_mode: false,
        }
    }
}

impl AnalysisParameters {
    /// Selected buffer clamped to `[-1, buffers_per_volume - 1]`.
    pub fn clamped_buffer_index(&self, buffers_per_volume: usize) -> i64 {
        let max = buffers_per_volume as i64 - 1;
        i64::from(self.buffer_index).clamp(ANY_BUFFER, max.max(ANY_BUFFER))
    }

    /// Selected frame clamped to `[0, frames_per_buffer - 1]`.
    pub fn clamped_frame_index(&self, frames_per_buffer: usize) -> usize {
        (self.frame_index as usize).min(frames_per_buffer.saturating_sub(1))
    }

    /// Decimation factor, never below one.
    pub fn decimation(&self) -> u32 {
        self.nth_buffer.max(1)
    }
}
