pub mod admission;
pub mod analysis;
pub mod consts;
pub mod error;
pub mod fit;
pub mod frame;
pub mod io;
pub mod profile;
pub mod roi;

pub use analysis::{AnalysisEvent, AnalysisParameters, Analyzer, FrameOutcome};
pub use error::{PsfError, Result};
pub use fit::{FitEngine, FitSettings, GaussianModel};
pub use frame::{AcquiredFrame, BufferSource, FrameGeometry};
pub use roi::Roi;
