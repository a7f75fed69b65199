//! Lane pixel extraction and per-side polynomial fitting.
//!
//! A bird's-eye mask is split at a vertical column (the frame center by
//! default); set pixels left of the split belong to the left lane line, the
//! rest to the right one.

use log::debug;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{fit_polynomial, BinaryMask, LaneGeometryError, LaneSide, PolynomialFit};

/// Pixel coordinates belonging to one lane line, stored column-wise so they
/// can be handed straight to [`fit_polynomial`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LanePixels {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl LanePixels {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    fn push(&mut self, x: usize, y: usize) {
        self.xs.push(x as f64);
        self.ys.push(y as f64);
    }

    /// Fit `x = f(y)` to the collected pixels.
    pub fn fit(&self) -> Result<PolynomialFit, LaneGeometryError> {
        Ok(fit_polynomial(&self.xs, &self.ys)?)
    }
}

/// Left and right lane fits for one mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneFits {
    pub left: PolynomialFit,
    pub right: PolynomialFit,
}

/// Split the set pixels of `mask` at column `split_x`.
///
/// Pixels with `x < split_x` go left, everything else goes right.
pub fn split_lane_pixels(mask: &BinaryMask, split_x: usize) -> (LanePixels, LanePixels) {
    let mut left = LanePixels::default();
    let mut right = LanePixels::default();
    for (x, y) in mask.nonzero_points() {
        if x < split_x {
            left.push(x, y);
        } else {
            right.push(x, y);
        }
    }
    (left, right)
}

/// Split `mask` at its center column and fit both lane lines.
///
/// Each side needs at least `min_pixels` set pixels (and three distinct rows
/// for the quadratic fit); the left side is checked first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask), fields(w = mask.width, h = mask.height))
)]
pub fn fit_lane_lines(
    mask: &BinaryMask,
    min_pixels: usize,
) -> Result<LaneFits, LaneGeometryError> {
    let (left_px, right_px) = split_lane_pixels(mask, mask.width / 2);
    debug!(
        "lane pixels: left={} right={} (min {})",
        left_px.len(),
        right_px.len(),
        min_pixels
    );

    let left = fit_side(&left_px, LaneSide::Left, min_pixels)?;
    let right = fit_side(&right_px, LaneSide::Right, min_pixels)?;
    Ok(LaneFits { left, right })
}

fn fit_side(
    px: &LanePixels,
    side: LaneSide,
    min_pixels: usize,
) -> Result<PolynomialFit, LaneGeometryError> {
    let needed = min_pixels.max(1);
    if px.len() < needed {
        return Err(LaneGeometryError::NotEnoughLanePixels {
            side,
            found: px.len(),
            needed,
        });
    }
    px.fit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FitError;
    use approx::assert_abs_diff_eq;

    fn draw_line(mask: &mut BinaryMask, fit: PolynomialFit) {
        for y in 0..mask.height {
            let x = fit.eval(y as f64).round();
            if x >= 0.0 {
                mask.set(x as usize, y, true);
            }
        }
    }

    #[test]
    fn split_assigns_by_column() {
        let mask = BinaryMask::from_fn(6, 2, |x, _| x == 1 || x == 3 || x == 5);
        let (left, right) = split_lane_pixels(&mask, 3);
        assert_eq!(left.xs, vec![1.0, 1.0]);
        assert_eq!(left.ys, vec![0.0, 1.0]);
        assert_eq!(right.len(), 4);
        assert!(right.xs.iter().all(|&x| x >= 3.0));
    }

    #[test]
    fn recovers_straight_lines() {
        let mut mask = BinaryMask::new(100, 80);
        draw_line(&mut mask, PolynomialFit::new(0.0, 0.0, 20.0));
        draw_line(&mut mask, PolynomialFit::new(0.0, 0.0, 75.0));

        let fits = fit_lane_lines(&mask, 10).expect("fits");
        assert_abs_diff_eq!(fits.left.c, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fits.left.a, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fits.right.c, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn recovers_curved_lines_within_rasterization_error() {
        let left = PolynomialFit::new(2e-3, -0.2, 30.0);
        let right = PolynomialFit::new(2e-3, -0.2, 130.0);
        let mut mask = BinaryMask::new(200, 100);
        draw_line(&mut mask, left);
        draw_line(&mut mask, right);

        let fits = fit_lane_lines(&mask, 20).expect("fits");
        for y in [0.0, 50.0, 99.0] {
            assert_abs_diff_eq!(fits.left.eval(y), left.eval(y), epsilon = 0.75);
            assert_abs_diff_eq!(fits.right.eval(y), right.eval(y), epsilon = 0.75);
        }
    }

    #[test]
    fn sparse_side_is_reported() {
        let mut mask = BinaryMask::new(100, 50);
        draw_line(&mut mask, PolynomialFit::new(0.0, 0.0, 80.0));
        mask.set(10, 5, true);

        let err = fit_lane_lines(&mask, 10).unwrap_err();
        assert_eq!(
            err,
            LaneGeometryError::NotEnoughLanePixels {
                side: LaneSide::Left,
                found: 1,
                needed: 10
            }
        );
    }

    #[test]
    fn single_row_side_cannot_be_fitted() {
        let mut mask = BinaryMask::new(100, 50);
        for x in 5..40 {
            mask.set(x, 10, true);
        }
        draw_line(&mut mask, PolynomialFit::new(0.0, 0.0, 80.0));

        let err = fit_lane_lines(&mask, 10).unwrap_err();
        assert_eq!(
            err,
            LaneGeometryError::Fit(FitError::NotEnoughPoints { needed: 3, got: 1 })
        );
    }
}
