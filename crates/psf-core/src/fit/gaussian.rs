use serde::{Deserialize, Serialize};

use crate::consts::FWHM_PER_SIGMA;

/// Peak-height Gaussian: `baseline + amplitude * exp(-(x - mean)^2 / (2 sigma^2))`.
///
/// `amplitude` is the height above `baseline`, not a normalized density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianModel {
    pub amplitude: f64,
    pub baseline: f64,
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianModel {
    /// Number of free parameters seen by the solver.
    pub const PARAMETER_COUNT: usize = 4;

    pub fn new(amplitude: f64, baseline: f64, mean: f64, sigma: f64) -> Self {
        Self {
            amplitude,
            baseline,
            mean,
            sigma,
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        let d = x - self.mean;
        self.baseline + self.amplitude * (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }

    /// Full width at half maximum. NaN when sigma is NaN.
    pub fn fwhm(&self) -> f64 {
        (FWHM_PER_SIGMA * self.sigma).abs()
    }

    /// Solver parameter order: amplitude, baseline, mean, sigma.
    pub fn to_params(&self) -> [f64; Self::PARAMETER_COUNT] {
        [self.amplitude, self.baseline, self.mean, self.sigma]
    }

    pub fn from_params(params: &[f64]) -> Self {
        Self::new(params[0], params[1], params[2], params[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_params().iter().all(|p| p.is_finite())
    }

    /// Sample the curve at `factor` points per unit step of `x`, starting at
    /// `x[0]` and covering `x.len()` units.
    pub fn sample(&self, x: &[f64], factor: usize) -> (Vec<f64>, Vec<f64>) {
        let Some(&start) = x.first() else {
            return (Vec::new(), Vec::new());
        };
        let count = x.len() * factor;
        let step = x.len() as f64 / count as f64;
        let fit_x: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
        let fit_y = fit_x.iter().map(|&xi| self.value(xi)).collect();
        (fit_x, fit_y)
    }
}
