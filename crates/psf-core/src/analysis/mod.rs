pub mod analyzer;
pub mod config;
pub mod events;
pub mod worker;

pub use analyzer::{AdmissionStats, Analyzer, FrameOutcome};
pub use config::{AnalysisParameters, ANY_BUFFER};
pub use events::AnalysisEvent;
pub use worker::{analyze_frame, spawn_worker, CycleOutput, FitJob, PeakFitWorker, PeakMetrics, WorkerState};
