use levenberg_marquardt::LevenbergMarquardt;
use tracing::debug;

use crate::consts::{
    DEFAULT_FIT_TOLERANCE, DEFAULT_INITIAL_BASELINE, DEFAULT_INITIAL_SIGMA,
    DEFAULT_MAX_EVALUATIONS,
};
use crate::error::{PsfError, Result};
use crate::profile::{find_max_position, ClampedLine};

use super::gaussian::GaussianModel;
use super::residual::GaussianResiduals;

/// Solver limits and the fixed part of the initial guess.
#[derive(Clone, Debug, PartialEq)]
pub struct FitSettings {
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_baseline: f64,
    pub initial_sigma: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_evaluations: DEFAULT_MAX_EVALUATIONS,
            ftol: DEFAULT_FIT_TOLERANCE,
            xtol: DEFAULT_FIT_TOLERANCE,
            gtol: DEFAULT_FIT_TOLERANCE,
            initial_baseline: DEFAULT_INITIAL_BASELINE,
            initial_sigma: DEFAULT_INITIAL_SIGMA,
        }
    }
}

/// Outcome of one minimization.
#[derive(Clone, Debug)]
pub struct FitReport {
    pub model: GaussianModel,
    /// Residual evaluations counted by the solver.
    pub evaluations: usize,
    /// Solver converged rather than running out of evaluations or failing.
    pub converged: bool,
    /// Final value of the objective `0.5 * ||r||^2`.
    pub objective: f64,
    pub termination: String,
}

/// Levenberg-Marquardt Gaussian fitter with fixed tolerances.
#[derive(Clone, Debug, Default)]
pub struct FitEngine {
    settings: FitSettings,
}

impl FitEngine {
    pub fn new(settings: FitSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Seed the fit from the full, unclamped profile.
    ///
    /// Amplitude and mean come from the profile maximum; baseline and sigma
    /// start at the configured defaults. An empty profile seeds at zero.
    pub fn initial_guess(&self, profile: &[f64]) -> GaussianModel {
        let (amplitude, mean) = match find_max_position(profile) {
            Some(pos) => (profile[pos], pos as f64),
            None => (0.0, 0.0),
        };
        GaussianModel::new(
            amplitude,
            self.settings.initial_baseline,
            mean,
            self.settings.initial_sigma,
        )
    }

    /// Minimize `sum (y - model(x))^2` over `line` starting from `initial`.
    ///
    /// Hitting the evaluation cap is not an error: the best parameters found
    /// so far are returned with `converged == false`.
    pub fn fit(&self, line: &ClampedLine, initial: GaussianModel) -> Result<FitReport> {
        if line.is_empty() {
            return Err(PsfError::Solver("no samples to fit".into()));
        }

        let problem = GaussianResiduals::new(&line.x, &line.y, &initial);
        let patience = (self.settings.max_evaluations / (GaussianModel::PARAMETER_COUNT + 1)).max(1);
        let solver = LevenbergMarquardt::new()
            .with_ftol(self.settings.ftol)
            .with_xtol(self.settings.xtol)
            .with_gtol(self.settings.gtol)
            .with_patience(patience);

        let (problem, report) = solver.minimize(problem);

        if report.termination.was_usage_issue() {
            return Err(PsfError::Solver(format!("{:?}", report.termination)));
        }

        let model = problem.model();
        debug!(
            termination = ?report.termination,
            evaluations = report.number_of_evaluations,
            samples = problem.sample_count(),
            ?model,
            "Gaussian fit finished"
        );

        Ok(FitReport {
            model,
            evaluations: report.number_of_evaluations,
            converged: report.termination.was_successful(),
            objective: report.objective_function,
            termination: format!("{:?}", report.termination),
        })
    }
}
