//! Second-degree lane-line polynomials `x = a·y² + b·y + c`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Minimum number of samples (with distinct `y`) for a quadratic fit.
const MIN_FIT_POINTS: usize = 3;

/// Singular values below this (relative to the largest) mark a rank-deficient system.
const RANK_EPS: f64 = 1e-12;

/// Lane-line polynomial giving the horizontal position `x` of a line as a
/// function of the image row `y`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolynomialFit {
    /// Quadratic (curvature) term.
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PolynomialFit {
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Build from `[a, b, c]`, highest degree first (the `polyfit` ordering).
    pub const fn from_array(coeffs: [f64; 3]) -> Self {
        Self::new(coeffs[0], coeffs[1], coeffs[2])
    }

    pub const fn to_array(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    #[inline]
    pub fn eval(&self, y: f64) -> f64 {
        (self.a * y + self.b) * y + self.c
    }

    /// `dx/dy` at `y`.
    #[inline]
    pub fn derivative(&self, y: f64) -> f64 {
        2.0 * self.a * y + self.b
    }

    /// `d²x/dy²`, constant for a quadratic.
    #[inline]
    pub fn second_derivative(&self) -> f64 {
        2.0 * self.a
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }

    /// A zero quadratic term describes a straight line with no defined radius.
    pub fn is_straight(&self) -> bool {
        self.a == 0.0
    }
}

/// Least-squares fitting failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("quadratic fit needs at least {needed} samples with distinct y, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },

    #[error("sample length mismatch (xs={xs}, ys={ys})")]
    MismatchedLengths { xs: usize, ys: usize },

    #[error("non-finite sample")]
    NonFinite,

    #[error("least-squares system is rank deficient")]
    Singular,
}

/// Fit `x = a·y² + b·y + c` to the samples `(xs[i], ys[i])` in the
/// least-squares sense.
///
/// `y` is rescaled by `max |y|` before solving so the Vandermonde columns
/// have comparable magnitude; the returned coefficients are in the caller's
/// units.
pub fn fit_polynomial(xs: &[f64], ys: &[f64]) -> Result<PolynomialFit, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::MismatchedLengths {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.iter().chain(ys).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let distinct = count_distinct(ys);
    if distinct < MIN_FIT_POINTS {
        return Err(FitError::NotEnoughPoints {
            needed: MIN_FIT_POINTS,
            got: distinct,
        });
    }

    // At least three distinct values, so at least one is non-zero.
    let scale = ys.iter().fold(0.0_f64, |m, y| m.max(y.abs()));

    let n = ys.len();
    let mut design = DMatrix::<f64>::zeros(n, 3);
    let mut rhs = DVector::<f64>::zeros(n);
    for (k, (&x, &y)) in xs.iter().zip(ys).enumerate() {
        let t = y / scale;
        design[(k, 0)] = t * t;
        design[(k, 1)] = t;
        design[(k, 2)] = 1.0;
        rhs[k] = x;
    }

    let svd = design.svd(true, true);
    let max_sv = svd.singular_values.max();
    if svd.rank(max_sv * RANK_EPS) < 3 {
        return Err(FitError::Singular);
    }
    let sol = svd
        .solve(&rhs, max_sv * RANK_EPS)
        .map_err(|_| FitError::Singular)?;

    let fit = PolynomialFit::new(sol[0] / (scale * scale), sol[1] / scale, sol[2]);
    if !fit.is_finite() {
        return Err(FitError::Singular);
    }
    Ok(fit)
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn eval_and_derivatives() {
        let p = PolynomialFit::new(2.0, -3.0, 5.0);
        assert_eq!(p.eval(0.0), 5.0);
        assert_eq!(p.eval(2.0), 8.0 - 6.0 + 5.0);
        assert_eq!(p.derivative(2.0), 8.0 - 3.0);
        assert_eq!(p.second_derivative(), 4.0);
        assert_eq!(PolynomialFit::from_array(p.to_array()), p);
    }

    #[test]
    fn recovers_exact_lane_quadratic() {
        let truth = PolynomialFit::new(2.5e-4, -0.35, 412.0);
        let ys: Vec<f64> = (0..720).step_by(8).map(f64::from).collect();
        let xs: Vec<f64> = ys.iter().map(|&y| truth.eval(y)).collect();

        let fit = fit_polynomial(&xs, &ys).expect("fit");
        assert_relative_eq!(fit.a, truth.a, max_relative = 1e-8);
        assert_relative_eq!(fit.b, truth.b, max_relative = 1e-8);
        assert_relative_eq!(fit.c, truth.c, max_relative = 1e-8);
    }

    #[test]
    fn straight_samples_give_zero_quadratic_term() {
        let ys: Vec<f64> = (300..700).map(f64::from).collect();
        let xs: Vec<f64> = ys.iter().map(|&y| 0.5 * y + 100.0).collect();
        let fit = fit_polynomial(&xs, &ys).expect("fit");
        assert!(fit.a.abs() < 1e-10, "a = {}", fit.a);
        assert_relative_eq!(fit.b, 0.5, epsilon = 1e-8);
    }

    #[test]
    fn least_squares_averages_symmetric_noise() {
        // Alternate +-1 px around x = 200 at every row.
        let ys: Vec<f64> = (0..100).map(f64::from).collect();
        let xs: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 201.0 } else { 199.0 })
            .collect();
        let fit = fit_polynomial(&xs, &ys).expect("fit");
        assert!((fit.eval(50.0) - 200.0).abs() < 0.1);
    }

    #[test]
    fn rejects_too_few_distinct_rows() {
        let err = fit_polynomial(&[1.0, 2.0, 3.0, 4.0], &[10.0, 10.0, 20.0, 20.0]).unwrap_err();
        assert_eq!(err, FitError::NotEnoughPoints { needed: 3, got: 2 });
    }

    #[test]
    fn rejects_mismatched_and_non_finite_input() {
        assert_eq!(
            fit_polynomial(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err(),
            FitError::MismatchedLengths { xs: 2, ys: 3 }
        );
        assert_eq!(
            fit_polynomial(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]).unwrap_err(),
            FitError::NonFinite
        );
    }
}
