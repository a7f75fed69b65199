//! Radius of curvature of the left/right lane lines.
//!
//! Curvature is evaluated at the largest sampled row, i.e. the row closest to
//! the vehicle. For a line `x = f(y)` the radius is
//!
//! ```text
//! R = (1 + f'(y)²)^(3/2) / |f''(y)|
//! ```
//!
//! Metric radii are *not* obtained by plugging a scaled `y` into the pixel
//! coefficients: curvature is not invariant under anisotropic scaling, so the
//! line is resampled, rescaled per axis and refitted in meters first.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{fit_polynomial, LaneGeometryError, LaneSide, PolynomialFit, ScaleFactors, UnitSystem};

/// Radii of curvature of both lane lines for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvatureResult {
    pub left: f64,
    pub right: f64,
    pub unit: UnitSystem,
}

impl CurvatureResult {
    /// Radius for one side.
    pub fn radius(&self, side: LaneSide) -> f64 {
        match side {
            LaneSide::Left => self.left,
            LaneSide::Right => self.right,
        }
    }

    pub fn mean(&self) -> f64 {
        0.5 * (self.left + self.right)
    }
}

impl fmt::Display for CurvatureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Left Lane Line Curvature Radius = {:.0} {}",
            self.left,
            self.unit.suffix()
        )?;
        write!(
            f,
            "Right Lane Line Curvature Radius = {:.0} {}",
            self.right,
            self.unit.suffix()
        )
    }
}

/// Radius of curvature of `fit` at row `y_eval`, in the fit's own units.
///
/// Returns `None` for a straight line (`a == 0`).
pub fn radius_of_curvature(fit: &PolynomialFit, y_eval: f64) -> Option<f64> {
    if fit.is_straight() {
        return None;
    }
    Some(radius_unchecked(fit, y_eval))
}

#[inline]
fn radius_unchecked(fit: &PolynomialFit, y_eval: f64) -> f64 {
    let slope = fit.derivative(y_eval);
    (1.0 + slope * slope).powf(1.5) / fit.second_derivative().abs()
}

/// Estimate both radii using the standard lane scale ([`ScaleFactors::LANE_DEFAULT`]).
///
/// `eval_ys` are the rows the fits are valid over; curvature is taken at
/// their maximum.
pub fn estimate_curvature(
    eval_ys: &[f64],
    left: PolynomialFit,
    right: PolynomialFit,
    unit: UnitSystem,
) -> Result<CurvatureResult, LaneGeometryError> {
    estimate_curvature_with_scale(eval_ys, left, right, unit, &ScaleFactors::LANE_DEFAULT)
}

/// Estimate both radii with explicit pixel-to-meter scale factors.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(eval_ys, scale), fields(samples = eval_ys.len()))
)]
pub fn estimate_curvature_with_scale(
    eval_ys: &[f64],
    left: PolynomialFit,
    right: PolynomialFit,
    unit: UnitSystem,
    scale: &ScaleFactors,
) -> Result<CurvatureResult, LaneGeometryError> {
    scale.validate()?;
    let y_eval = max_sample(eval_ys)?;
    if !left.is_finite() || !right.is_finite() {
        return Err(LaneGeometryError::NonFinite);
    }
    for (side, fit) in [(LaneSide::Left, &left), (LaneSide::Right, &right)] {
        if fit.is_straight() {
            return Err(LaneGeometryError::DegenerateFit { side });
        }
    }

    let (left_r, right_r) = match unit {
        UnitSystem::Pixels => (
            radius_unchecked(&left, y_eval),
            radius_unchecked(&right, y_eval),
        ),
        UnitSystem::Meters => (
            metric_radius(eval_ys, y_eval, &left, scale, LaneSide::Left)?,
            metric_radius(eval_ys, y_eval, &right, scale, LaneSide::Right)?,
        ),
    };

    debug!(
        "curvature at y={:.1}: left={:.2} right={:.2} {}",
        y_eval,
        left_r,
        right_r,
        unit.suffix()
    );

    Ok(CurvatureResult {
        left: left_r,
        right: right_r,
        unit,
    })
}

fn max_sample(eval_ys: &[f64]) -> Result<f64, LaneGeometryError> {
    if eval_ys.is_empty() {
        return Err(LaneGeometryError::EmptySample);
    }
    if eval_ys.iter().any(|y| !y.is_finite()) {
        return Err(LaneGeometryError::NonFinite);
    }
    Ok(eval_ys.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Resample `fit` over `eval_ys`, rescale both axes to meters, refit and
/// evaluate at the rescaled `y_eval`.
fn metric_radius(
    eval_ys: &[f64],
    y_eval: f64,
    fit: &PolynomialFit,
    scale: &ScaleFactors,
    side: LaneSide,
) -> Result<f64, LaneGeometryError> {
    let ys_m: Vec<f64> = eval_ys.iter().map(|&y| scale.y_to_meters(y)).collect();
    let xs_m: Vec<f64> = eval_ys
        .iter()
        .map(|&y| scale.x_to_meters(fit.eval(y)))
        .collect();

    let fit_m = fit_polynomial(&xs_m, &ys_m)?;
    radius_of_curvature(&fit_m, scale.y_to_meters(y_eval))
        .ok_or(LaneGeometryError::DegenerateFit { side })
}
