use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::admission::{Admission, FrameAdmissionPolicy, SkipReason};
use crate::error::{PsfError, Result};
use crate::fit::FitEngine;
use crate::frame::AcquiredFrame;
use crate::roi::Roi;

use super::config::AnalysisParameters;
use super::events::AnalysisEvent;
use super::worker::{spawn_worker, FitJob};

/// What happened to a buffer offered through [`Analyzer::on_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Copied into `slot` and handed to the fit worker.
    Queued { slot: usize, single_shot: bool },
    Skipped(SkipReason),
}

impl FrameOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Running totals over every buffer delivered to the analyzer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    pub delivered: u64,
    pub queued: u64,
    pub skipped: u64,
    /// Buffers lost to the busy gate or a backlogged worker.
    pub dropped_busy: u64,
    pub errors: u64,
}

/// Producer-side entry point of the analysis core.
///
/// `on_frame` is meant to be called from the acquisition callback. It never
/// blocks: admission is O(1) plus one frame copy, and the hand-off to the fit
/// worker uses a one-slot channel with `try_send`, dropping the frame when
/// the worker has not caught up.
pub struct Analyzer {
    policy: FrameAdmissionPolicy,
    jobs: Option<mpsc::SyncSender<FitJob>>,
    events: mpsc::Sender<AnalysisEvent>,
    in_flight: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
    stats: AdmissionStats,
}

impl Analyzer {
    /// Start the fit worker thread and return the producer handle.
    pub fn spawn(
        params: AnalysisParameters,
        engine: FitEngine,
        events: mpsc::Sender<AnalysisEvent>,
    ) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::sync_channel::<FitJob>(1);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker = spawn_worker(engine, job_rx, events.clone(), Arc::clone(&in_flight))?;

        Ok(Self {
            policy: FrameAdmissionPolicy::new(params, events.clone()),
            jobs: Some(job_tx),
            events,
            in_flight,
            worker: Some(worker),
            stats: AdmissionStats::default(),
        })
    }

    /// Offer one delivered buffer. The borrow of `frame.data` ends on return.
    pub fn on_frame(&mut self, frame: &AcquiredFrame<'_>) -> Result<FrameOutcome> {
        self.stats.delivered += 1;
        let busy = self.is_busy();

        let staged = match self.policy.admit(frame, busy) {
            Ok(Admission::Admitted(staged)) => staged,
            Ok(Admission::Skipped(reason)) => return Ok(self.skipped(reason)),
            Err(e) => {
                warn!(error = %e, "Frame rejected");
                self.stats.errors += 1;
                let _ = self.events.send(AnalysisEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let Some(jobs) = self.jobs.as_ref() else {
            self.stats.errors += 1;
            return Err(PsfError::WorkerUnavailable("analyzer shut down".into()));
        };

        let slot = staged.slot;
        let single_shot = staged.single_shot;
        let job = FitJob {
            frame: staged,
            params: self.policy.params().clone(),
        };

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        match jobs.try_send(job) {
            Ok(()) => {
                self.stats.queued += 1;
                debug!(slot, single_shot, "Frame queued for fitting");
                Ok(FrameOutcome::Queued { slot, single_shot })
            }
            Err(TrySendError::Full(job)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                drop(job);
                if single_shot {
                    self.policy.request_single_shot();
                }
                Ok(self.skipped(SkipReason::WorkerBacklogged))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                self.stats.errors += 1;
                let e = PsfError::WorkerUnavailable("fit worker stopped".into());
                warn!(error = %e, "Frame hand-off failed");
                let _ = self.events.send(AnalysisEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn skipped(&mut self, reason: SkipReason) -> FrameOutcome {
        self.stats.skipped += 1;
        if matches!(reason, SkipReason::Busy | SkipReason::WorkerBacklogged) {
            self.stats.dropped_busy += 1;
        }
        FrameOutcome::Skipped(reason)
    }

    /// True while a handed-off frame has not finished publishing.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn stats(&self) -> AdmissionStats {
        self.stats
    }

    pub fn params(&self) -> &AnalysisParameters {
        self.policy.params()
    }

    /// Replace the parameter snapshot used for subsequent cycles.
    pub fn set_params(&mut self, params: AnalysisParameters) {
        self.policy.set_params(params);
    }

    pub fn set_roi(&mut self, roi: Roi) {
        self.policy.params_mut().roi = roi;
        let _ = self.events.send(AnalysisEvent::Info(format!("ROI: {roi}")));
    }

    pub fn set_auto_fetch(&mut self, enabled: bool) {
        self.policy.params_mut().auto_fetch = enabled;
    }

    pub fn set_nth_buffer(&mut self, nth_buffer: u32) {
        self.policy.params_mut().nth_buffer = nth_buffer;
    }

    /// Analyze the next eligible buffer regardless of busy state and decimation.
    pub fn request_single_shot(&mut self) {
        self.policy.request_single_shot();
    }

    pub fn policy(&self) -> &FrameAdmissionPolicy {
        &self.policy
    }

    /// Close the job channel and wait for the worker to finish queued work.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Fit worker panicked");
            }
        }
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.stop_worker();
    }
}
