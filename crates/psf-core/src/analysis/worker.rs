use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::admission::StagedFrame;
use crate::consts::{FIT_OVERSAMPLING, FWHM_NOT_POSSIBLE};
use crate::error::{PsfError, Result};
use crate::fit::{FitEngine, FitReport, GaussianModel};
use crate::frame::{FrameGeometry, FrameSamples};
use crate::profile::{averaged_line, clamp_line, ClampedLine};
use crate::roi::Roi;

use super::config::AnalysisParameters;
use super::events::AnalysisEvent;

/// Peak position and FWHM derived from one fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakMetrics {
    /// Fitted mean in pixels; NaN when no peak was detected.
    pub peak_position: f64,
    /// FWHM in pixels; negative when no fit was possible.
    pub fwhm: f64,
}

impl PeakMetrics {
    pub const NOT_FOUND: PeakMetrics = PeakMetrics {
        peak_position: f64::NAN,
        fwhm: FWHM_NOT_POSSIBLE,
    };

    /// Map a fitted model onto the sentinel conventions.
    pub fn from_model(model: &GaussianModel) -> Self {
        let fwhm = model.fwhm();
        Self {
            peak_position: if model.mean.is_finite() {
                model.mean
            } else {
                f64::NAN
            },
            fwhm: if fwhm.is_finite() {
                fwhm
            } else {
                FWHM_NOT_POSSIBLE
            },
        }
    }

    pub fn peak_detected(&self) -> bool {
        !self.peak_position.is_nan()
    }

    pub fn fit_possible(&self) -> bool {
        self.fwhm >= 0.0
    }
}

/// Everything a fit cycle needs, owned by value.
#[derive(Clone, Debug)]
pub struct FitJob {
    pub frame: StagedFrame,
    pub params: AnalysisParameters,
}

/// Products of one fit cycle.
#[derive(Clone, Debug)]
pub struct CycleOutput {
    pub line: ClampedLine,
    pub fit_x: Vec<f64>,
    pub fit_y: Vec<f64>,
    pub metrics: PeakMetrics,
    pub report: Option<FitReport>,
    /// Why the metrics are sentinels, if they are. Logged, not published.
    pub warning: Option<String>,
    /// Decode or solver usage failure, published as an advisory error.
    pub error: Option<String>,
}

impl CycleOutput {
    /// Sentinel metrics; the curve is `seed` sampled over the line's domain.
    fn degenerate(line: ClampedLine, seed: &GaussianModel, warning: impl Into<String>) -> Self {
        let (fit_x, fit_y) = seed.sample(&line.x, FIT_OVERSAMPLING);
        Self {
            line,
            fit_x,
            fit_y,
            metrics: PeakMetrics::NOT_FOUND,
            report: None,
            warning: Some(warning.into()),
            error: None,
        }
    }

    fn failed(line: ClampedLine, error: String) -> Self {
        Self {
            line,
            fit_x: Vec::new(),
            fit_y: Vec::new(),
            metrics: PeakMetrics::NOT_FOUND,
            report: None,
            warning: None,
            error: Some(error),
        }
    }
}

/// Run extraction and fitting for one frame without publishing anything.
///
/// Only a frame that cannot be decoded is an `Err`. Empty, flat and diverged
/// fits produce sentinel metrics with a `warning`; a solver usage failure
/// sets `error`.
pub fn analyze_frame(
    engine: &FitEngine,
    bytes: &[u8],
    geometry: &FrameGeometry,
    roi: &Roi,
) -> Result<CycleOutput> {
    let samples = FrameSamples::decode(bytes, geometry)?;
    let profile = averaged_line(&samples, roi);
    let (start, end) = roi.column_span();
    let line = clamp_line(&profile, start, end);
    let initial = engine.initial_guess(&profile);

    if line.is_empty() {
        return Ok(CycleOutput::degenerate(line, &initial, "Empty data, nothing to fit"));
    }
    if !line.has_variation() {
        return Ok(CycleOutput::degenerate(line, &initial, "Flat line, no peak to fit"));
    }

    let report = match engine.fit(&line, initial) {
        Ok(report) => report,
        Err(e) => {
            let mut output = CycleOutput::degenerate(line, &initial, "Solver failed");
            output.error = Some(e.to_string());
            return Ok(output);
        }
    };

    if !report.model.is_finite() {
        let warning = format!("Fit diverged ({})", report.termination);
        warn!(%warning, "Non-finite fit parameters");
        let mut output = CycleOutput::degenerate(line, &initial, warning);
        output.report = Some(report);
        return Ok(output);
    }

    let (fit_x, fit_y) = report.model.sample(&line.x, FIT_OVERSAMPLING);
    Ok(CycleOutput {
        metrics: PeakMetrics::from_model(&report.model),
        line,
        fit_x,
        fit_y,
        report: Some(report),
        warning: None,
        error: None,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fitting,
}

/// Runs fit cycles and publishes their results.
///
/// Cycles execute strictly one after another on the owning thread; a
/// request that arrives while a cycle is running is dropped.
pub struct PeakFitWorker {
    engine: FitEngine,
    state: WorkerState,
    events: mpsc::Sender<AnalysisEvent>,
    cycles: u64,
}

impl PeakFitWorker {
    pub fn new(engine: FitEngine, events: mpsc::Sender<AnalysisEvent>) -> Self {
        Self {
            engine,
            state: WorkerState::Idle,
            events,
            cycles: 0,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Completed cycles since creation.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one cycle for `job` unless one is already running.
    pub fn fit_peak(&mut self, job: &FitJob) -> Option<CycleOutput> {
        if self.state == WorkerState::Fitting {
            debug!("Fit request dropped, worker busy");
            return None;
        }
        self.state = WorkerState::Fitting;

        let output = match analyze_frame(
            &self.engine,
            job.frame.bytes(),
            &job.frame.geometry,
            &job.params.roi,
        ) {
            Ok(output) => output,
            Err(e) => CycleOutput::failed(ClampedLine::default(), e.to_string()),
        };

        if let Some(ref error) = output.error {
            warn!(%error, "Fit cycle failed");
            let _ = self.events.send(AnalysisEvent::Error(error.clone()));
        } else if let Some(ref warning) = output.warning {
            debug!(%warning, "Publishing sentinel metrics");
        }
        self.publish(&output);

        self.state = WorkerState::Idle;
        self.cycles += 1;
        Some(output)
    }

    fn publish(&self, output: &CycleOutput) {
        let _ = self.events.send(AnalysisEvent::AveragedLine {
            x: output.line.x.clone(),
            y: output.line.y.clone(),
        });
        let _ = self.events.send(AnalysisEvent::FittedCurve {
            x: output.fit_x.clone(),
            y: output.fit_y.clone(),
        });
        let _ = self
            .events
            .send(AnalysisEvent::PeakPosition(output.metrics.peak_position));
        let _ = self.events.send(AnalysisEvent::Fwhm(output.metrics.fwhm));
    }
}

/// Spawn the fit worker thread.
///
/// The thread runs until every job sender is dropped. `in_flight` counts
/// jobs handed over by the producer; it is decremented only after a job's
/// results are published and its staging slot is released.
pub fn spawn_worker(
    engine: FitEngine,
    jobs: mpsc::Receiver<FitJob>,
    events: mpsc::Sender<AnalysisEvent>,
    in_flight: Arc<AtomicUsize>,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("psf-fit-worker".into())
        .spawn(move || {
            let mut worker = PeakFitWorker::new(engine, events);
            while let Ok(job) = jobs.recv() {
                worker.fit_peak(&job);
                drop(job);
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            debug!(cycles = worker.cycles(), "Fit worker stopped");
        })
        .map_err(PsfError::Io)
}
