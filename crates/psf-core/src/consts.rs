/// Minimum ROI pixel count (rows * cols) to sum columns with Rayon.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of staging buffers used to decouple the producer from the fit worker.
pub const STAGING_POOL_SIZE: usize = 2;

/// 2 * sqrt(2 * ln 2): converts a Gaussian sigma into its FWHM.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045;

/// Initial baseline guess handed to the solver.
pub const DEFAULT_INITIAL_BASELINE: f64 = 10.0;

/// Initial sigma guess handed to the solver.
pub const DEFAULT_INITIAL_SIGMA: f64 = 10.0;

/// Upper bound on residual evaluations per fit.
pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

/// Relative tolerance on the parameter step, the cost and the gradient.
pub const DEFAULT_FIT_TOLERANCE: f64 = 1e-6;

/// The fitted curve is sampled this many times denser than the input line.
pub const FIT_OVERSAMPLING: usize = 10;

/// FWHM reported when no fit was possible.
pub const FWHM_NOT_POSSIBLE: f64 = -1.0;

/// Default decimation: analyze every Nth admitted buffer.
pub const DEFAULT_NTH_BUFFER: u32 = 10;

/// Largest supported sample bit depth.
pub const MAX_BIT_DEPTH: u32 = 32;
