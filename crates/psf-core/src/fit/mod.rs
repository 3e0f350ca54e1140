pub mod engine;
pub mod gaussian;
pub mod residual;

pub use engine::{FitEngine, FitReport, FitSettings};
pub use gaussian::GaussianModel;
pub use residual::GaussianResiduals;
