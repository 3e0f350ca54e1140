pub mod staging;

use std::sync::mpsc;

use tracing::{debug, info};

use crate::analysis::config::{AnalysisParameters, ANY_BUFFER};
use crate::analysis::events::AnalysisEvent;
use crate::consts::STAGING_POOL_SIZE;
use crate::error::{PsfError, Result};
use crate::frame::{AcquiredFrame, FrameGeometry};

pub use staging::{StagedFrame, StagingPool};

/// Why a delivered buffer was not handed to the fit worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Auto-fetch is off and no single shot is armed.
    Paused,
    /// A fit is already in flight.
    Busy,
    /// The buffer comes from the stream that is not being analyzed.
    WrongSource,
    /// The buffer index within the volume is not the selected one.
    BufferNotSelected,
    /// Dropped by the every-Nth-buffer throttle.
    Decimated,
    /// The next staging slot is still referenced by a pending fit.
    SlotInUse,
    /// The worker had not yet picked up the previous frame.
    WorkerBacklogged,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paused => write!(f, "Paused"),
            Self::Busy => write!(f, "Fit in progress"),
            Self::WrongSource => write!(f, "Other buffer source"),
            Self::BufferNotSelected => write!(f, "Buffer not selected"),
            Self::Decimated => write!(f, "Decimated"),
            Self::SlotInUse => write!(f, "Staging slot in use"),
            Self::WorkerBacklogged => write!(f, "Worker backlogged"),
        }
    }
}

/// Result of offering one buffer to the admission policy.
#[derive(Debug)]
pub enum Admission {
    Admitted(StagedFrame),
    Skipped(SkipReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Admitted(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Decides, on the producer's thread, which delivered buffer gets analyzed
/// and copies the selected frame into double-buffered staging storage.
///
/// Every decision is O(1) plus one bounded copy; nothing here waits on the
/// fit worker.
pub struct FrameAdmissionPolicy {
    params: AnalysisParameters,
    single_shot: bool,
    decimation_counter: u32,
    frames_per_buffer: Option<usize>,
    buffers_per_volume: Option<usize>,
    staged_geometry: Option<(FrameGeometry, usize)>,
    pool: StagingPool,
    events: mpsc::Sender<AnalysisEvent>,
}

impl FrameAdmissionPolicy {
    pub fn new(params: AnalysisParameters, events: mpsc::Sender<AnalysisEvent>) -> Self {
        Self {
            params,
            single_shot: false,
            decimation_counter: 0,
            frames_per_buffer: None,
            buffers_per_volume: None,
            staged_geometry: None,
            pool: StagingPool::new(STAGING_POOL_SIZE),
            events,
        }
    }

    pub fn params(&self) -> &AnalysisParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: AnalysisParameters) {
        self.params = params;
    }

    pub fn params_mut(&mut self) -> &mut AnalysisParameters {
        &mut self.params
    }

    /// Arm a one-time bypass of the busy and decimation gates.
    pub fn request_single_shot(&mut self) {
        self.single_shot = true;
    }

    pub fn single_shot_pending(&self) -> bool {
        self.single_shot
    }

    pub fn decimation_counter(&self) -> u32 {
        self.decimation_counter
    }

    pub fn staging(&self) -> &StagingPool {
        &self.pool
    }

    /// Offer one delivered buffer.
    ///
    /// `busy` reports whether a fit is currently in flight. Invalid geometry
    /// or a short source buffer abort the cycle with an error and leave the
    /// staging storage untouched.
    pub fn admit(&mut self, frame: &AcquiredFrame<'_>, busy: bool) -> Result<Admission> {
        let single_shot = self.single_shot;

        if !single_shot {
            if !self.params.auto_fetch {
                return Ok(Admission::Skipped(SkipReason::Paused));
            }
            if busy {
                return Ok(Admission::Skipped(SkipReason::Busy));
            }
        }

        if frame.source != self.params.buffer_source {
            return Ok(Admission::Skipped(SkipReason::WrongSource));
        }

        let selected_buffer = self.params.clamped_buffer_index(frame.buffers_per_volume);
        if selected_buffer != ANY_BUFFER && selected_buffer != frame.current_buffer as i64 {
            return Ok(Admission::Skipped(SkipReason::BufferNotSelected));
        }

        if !single_shot {
            self.decimation_counter += 1;
            if self.decimation_counter < self.params.decimation() {
                debug!(
                    counter = self.decimation_counter,
                    nth = self.params.decimation(),
                    "Buffer decimated"
                );
                return Ok(Admission::Skipped(SkipReason::Decimated));
            }
        }
        self.decimation_counter = 0;

        self.publish_geometry_notices(frame);

        frame.validate()?;
        let geometry = frame.geometry();
        let bytes_per_frame = geometry.bytes_per_frame()?;

        let key = (geometry, frame.frames_per_buffer);
        if self.staged_geometry != Some(key) {
            info!(
                bit_depth = geometry.bit_depth,
                width = geometry.width,
                height = geometry.height,
                frames_per_buffer = frame.frames_per_buffer,
                bytes_per_frame,
                "Reallocating staging buffers"
            );
            self.pool.reallocate(bytes_per_frame);
            self.staged_geometry = Some(key);
        }

        let frame_index = self.params.clamped_frame_index(frame.frames_per_buffer);
        let offset = bytes_per_frame.saturating_mul(frame_index);
        let end = offset.saturating_add(bytes_per_frame);
        if frame.data.len() < end {
            return Err(PsfError::BufferTooSmall {
                expected: end,
                actual: frame.data.len(),
            });
        }

        let Some((slot, data)) = self.pool.stage(&frame.data[offset..end]) else {
            debug!(slot = self.pool.next_slot(), "Staging slot still in use");
            return Ok(Admission::Skipped(SkipReason::SlotInUse));
        };

        self.single_shot = false;
        debug!(slot, frame_index, single_shot, "Frame staged");
        Ok(Admission::Admitted(StagedFrame {
            data,
            geometry,
            slot,
            single_shot,
        }))
    }

    fn publish_geometry_notices(&mut self, frame: &AcquiredFrame<'_>) {
        if self.frames_per_buffer != Some(frame.frames_per_buffer) {
            self.frames_per_buffer = Some(frame.frames_per_buffer);
            info!(frames_per_buffer = frame.frames_per_buffer, "Frames per buffer changed");
            let _ = self
                .events
                .send(AnalysisEvent::MaxFrameIndex(frame.frames_per_buffer as i64 - 1));
        }
        if self.buffers_per_volume != Some(frame.buffers_per_volume) {
            self.buffers_per_volume = Some(frame.buffers_per_volume);
            info!(buffers_per_volume = frame.buffers_per_volume, "Buffers per volume changed");
            let _ = self
                .events
                .send(AnalysisEvent::MaxBufferIndex(frame.buffers_per_volume as i64 - 1));
        }
    }
}
