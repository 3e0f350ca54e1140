use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use super::gaussian::GaussianModel;

/// Least-squares view of a Gaussian fit over fixed `(x, y)` samples.
///
/// Residuals are `y - model(x)`. The Jacobian is taken by forward
/// differences, so the model never needs analytic derivatives.
pub struct GaussianResiduals<'a> {
    x: &'a [f64],
    y: &'a [f64],
    params: DVector<f64>,
}

impl<'a> GaussianResiduals<'a> {
    pub fn new(x: &'a [f64], y: &'a [f64], initial: &GaussianModel) -> Self {
        debug_assert_eq!(x.len(), y.len());
        Self {
            x,
            y,
            params: DVector::from_row_slice(&initial.to_params()),
        }
    }

    /// Model for the current parameter vector.
    pub fn model(&self) -> GaussianModel {
        GaussianModel::from_params(self.params.as_slice())
    }

    pub fn sample_count(&self) -> usize {
        self.x.len()
    }

    fn residuals_at(&self, params: &DVector<f64>) -> DVector<f64> {
        let model = GaussianModel::from_params(params.as_slice());
        DVector::from_iterator(
            self.x.len(),
            self.x
                .iter()
                .zip(self.y)
                .map(|(&xi, &yi)| yi - model.value(xi)),
        )
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for GaussianResiduals<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.params.copy_from(params);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.residuals_at(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let step_scale = f64::EPSILON.sqrt();
        let base = self.residuals_at(&self.params);
        let mut jacobian = DMatrix::zeros(self.x.len(), self.params.len());

        for j in 0..self.params.len() {
            let mut shifted = self.params.clone();
            let mut h = step_scale * shifted[j].abs();
            if h == 0.0 {
                h = step_scale;
            }
            shifted[j] += h;
            let column = (self.residuals_at(&shifted) - &base) / h;
            jacobian.column_mut(j).copy_from(&column);
        }

        Some(jacobian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_residuals_zero_for_exact_model() {
        let model = GaussianModel::new(10.0, 1.0, 3.0, 2.0);
        let x: Vec<f64> = (0..8).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&xi| model.value(xi)).collect();
        let problem = GaussianResiduals::new(&x, &y, &model);
        let r = problem.residuals().unwrap();
        assert!(r.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_jacobian_baseline_column() {
        // d(y - model)/d(baseline) = -1 everywhere.
        let model = GaussianModel::new(10.0, 1.0, 3.0, 2.0);
        let x: Vec<f64> = (0..5).map(f64::from).collect();
        let y = vec![0.0; 5];
        let problem = GaussianResiduals::new(&x, &y, &model);
        let j = problem.jacobian().unwrap();
        assert_eq!(j.shape(), (5, 4));
        for row in 0..5 {
            assert!((j[(row, 1)] + 1.0).abs() < 1e-6);
        }
    }
}
