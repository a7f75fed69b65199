//! Per-frame lane estimation.
//!
//! A [`LaneFrame`] carries everything the estimators need for one video
//! frame. [`estimate_lane`] turns it into a [`LaneReport`]; a caller-owned
//! [`FrameHoldover`] keeps the last good report around when a frame fails.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::core::{
    estimate_curvature_with_scale, estimate_offset_with_scale, fit_lane_lines, BinaryMask,
    CurvatureResult, LaneGeometryError, OffsetResult, PolynomialFit, ScaleFactors, UnitSystem,
};

/// Fitted lane lines for one bird's-eye frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneFrame {
    pub image_width: f64,
    pub image_height: f64,
    /// Rows the fits are valid over; curvature is evaluated at the largest.
    pub eval_ys: Vec<f64>,
    pub left_fit: PolynomialFit,
    pub right_fit: PolynomialFit,
}

/// Largest image height for which [`LaneFrame::new`] samples every row.
pub const MAX_IMAGE_ROWS: usize = 1 << 16;

impl LaneFrame {
    /// Frame whose fits cover every row `0..image_height`.
    ///
    /// The width must be finite and positive and the height a whole number
    /// of rows in `1..=MAX_IMAGE_ROWS`; anything else is `InvalidImageSize`.
    pub fn new(
        image_width: f64,
        image_height: f64,
        left_fit: PolynomialFit,
        right_fit: PolynomialFit,
    ) -> Result<Self, LaneGeometryError> {
        let rows = image_rows(image_width, image_height)?;
        Ok(Self::with_samples(
            image_width,
            image_height,
            (0..rows).map(|y| y as f64).collect(),
            left_fit,
            right_fit,
        ))
    }

    /// Frame with caller-chosen sample rows; nothing is allocated per row.
    pub fn with_samples(
        image_width: f64,
        image_height: f64,
        eval_ys: Vec<f64>,
        left_fit: PolynomialFit,
        right_fit: PolynomialFit,
    ) -> Self {
        Self {
            image_width,
            image_height,
            eval_ys,
            left_fit,
            right_fit,
        }
    }

    /// Fit both lane lines from a bird's-eye binary mask.
    pub fn from_mask(mask: &BinaryMask, min_pixels: usize) -> Result<Self, LaneGeometryError> {
        let fits = fit_lane_lines(mask, min_pixels)?;
        Self::new(mask.width as f64, mask.height as f64, fits.left, fits.right)
    }

    pub fn with_eval_ys(mut self, eval_ys: Vec<f64>) -> Self {
        self.eval_ys = eval_ys;
        self
    }
}

fn image_rows(image_width: f64, image_height: f64) -> Result<usize, LaneGeometryError> {
    let width_ok = image_width.is_finite() && image_width > 0.0;
    let height_ok = image_height >= 1.0
        && image_height <= MAX_IMAGE_ROWS as f64
        && image_height.fract() == 0.0;
    if width_ok && height_ok {
        Ok(image_height as usize)
    } else {
        Err(LaneGeometryError::InvalidImageSize {
            width: image_width,
            height: image_height,
        })
    }
}

/// Curvature and offset for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneReport {
    pub curvature: CurvatureResult,
    pub offset: OffsetResult,
}

impl fmt::Display for LaneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.curvature)?;
        write!(f, "{}", self.offset)
    }
}

/// Run the curvature and offset estimators on one frame.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(frame, scale),
        fields(w = frame.image_width, h = frame.image_height)
    )
)]
pub fn estimate_lane(
    frame: &LaneFrame,
    unit: UnitSystem,
    scale: &ScaleFactors,
) -> Result<LaneReport, LaneGeometryError> {
    let curvature = estimate_curvature_with_scale(
        &frame.eval_ys,
        frame.left_fit,
        frame.right_fit,
        unit,
        scale,
    )?;
    let offset = estimate_offset_with_scale(
        frame.image_width,
        frame.image_height,
        frame.left_fit,
        frame.right_fit,
        unit,
        scale,
    )?;
    Ok(LaneReport { curvature, offset })
}

/// What [`FrameHoldover::update`] did with a frame result.
#[derive(Clone, Debug, PartialEq)]
pub enum HoldoverOutcome {
    /// The frame succeeded; its report is now the last good one.
    Fresh(LaneReport),
    /// The frame failed; the previous good report stands in for it.
    HeldOver {
        report: LaneReport,
        error: LaneGeometryError,
    },
    /// The frame failed and no good report has been seen yet.
    Empty(LaneGeometryError),
}

impl HoldoverOutcome {
    /// The report to display for this frame, if any.
    pub fn report(&self) -> Option<&LaneReport> {
        match self {
            HoldoverOutcome::Fresh(report) | HoldoverOutcome::HeldOver { report, .. } => {
                Some(report)
            }
            HoldoverOutcome::Empty(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LaneGeometryError> {
        match self {
            HoldoverOutcome::Fresh(_) => None,
            HoldoverOutcome::HeldOver { error, .. } | HoldoverOutcome::Empty(error) => Some(error),
        }
    }

    pub fn is_held_over(&self) -> bool {
        matches!(self, HoldoverOutcome::HeldOver { .. })
    }
}

/// Last-good-report cache for a frame sequence.
#[derive(Clone, Debug, Default)]
pub struct FrameHoldover {
    last: Option<LaneReport>,
    consecutive_failures: usize,
}

impl FrameHoldover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&LaneReport> {
        self.last.as_ref()
    }

    /// Number of failed frames since the last good one.
    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    pub fn update(&mut self, result: Result<LaneReport, LaneGeometryError>) -> HoldoverOutcome {
        match result {
            Ok(report) => {
                if self.consecutive_failures > 0 {
                    debug!(
                        "lane estimate recovered after {} failed frame(s)",
                        self.consecutive_failures
                    );
                }
                self.last = Some(report);
                self.consecutive_failures = 0;
                HoldoverOutcome::Fresh(report)
            }
            Err(error) => {
                self.consecutive_failures += 1;
                match self.last {
                    Some(report) => {
                        warn!("lane estimate failed ({error}); holding previous report");
                        HoldoverOutcome::HeldOver { report, error }
                    }
                    None => {
                        warn!("lane estimate failed ({error}); no previous report");
                        HoldoverOutcome::Empty(error)
                    }
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LaneSide, VehicleSide};
    use approx::assert_relative_eq;

    fn curved_frame() -> LaneFrame {
        LaneFrame::new(
            1280.0,
            720.0,
            PolynomialFit::new(2.0e-4, -0.3, 380.0),
            PolynomialFit::new(2.0e-4, -0.3, 1010.0),
        )
        .expect("frame")
    }

    #[test]
    fn new_frame_samples_every_row() {
        let frame = curved_frame();
        assert_eq!(frame.eval_ys.len(), 720);
        assert_eq!(frame.eval_ys.first(), Some(&0.0));
        assert_eq!(frame.eval_ys.last(), Some(&719.0));
    }

    #[test]
    fn new_frame_rejects_unusable_heights() {
        let fit = PolynomialFit::new(2.0e-4, 0.0, 300.0);
        for (w, h) in [
            (1280.0, 0.0),
            (1280.0, f64::NAN),
            (1280.0, 719.5),
            (1280.0, 1e20),
            (1280.0, (MAX_IMAGE_ROWS + 1) as f64),
            (0.0, 720.0),
        ] {
            assert!(matches!(
                LaneFrame::new(w, h, fit, fit),
                Err(LaneGeometryError::InvalidImageSize { .. })
            ));
        }
        let tall = LaneFrame::new(1280.0, MAX_IMAGE_ROWS as f64, fit, fit).expect("frame");
        assert_eq!(tall.eval_ys.len(), MAX_IMAGE_ROWS);
    }

    #[test]
    fn explicit_samples_skip_row_allocation() {
        let fit = PolynomialFit::new(2.0e-4, 0.0, 300.0);
        let frame = LaneFrame::with_samples(1280.0, 1e20, vec![0.0, 719.0], fit, fit);
        assert_eq!(frame.eval_ys, vec![0.0, 719.0]);
        let report = estimate_lane(&frame, UnitSystem::Pixels, &ScaleFactors::default())
            .expect("report");
        assert!(report.curvature.left.is_finite());
    }

    #[test]
    fn pixel_report_matches_estimators() {
        let frame = curved_frame();
        let report = estimate_lane(&frame, UnitSystem::Pixels, &ScaleFactors::default())
            .expect("report");

        let slope: f64 = 2.0 * 2.0e-4 * 719.0 - 0.3;
        let expected = (1.0 + slope * slope).powf(1.5) / (2.0 * 2.0e-4);
        assert_relative_eq!(report.curvature.left, expected, max_relative = 1e-9);
        assert_relative_eq!(report.curvature.right, expected, max_relative = 1e-9);

        let x_bottom = 2.0e-4 * 720.0 * 720.0 - 0.3 * 720.0;
        let center = x_bottom + (380.0 + 1010.0) / 2.0;
        assert_relative_eq!(report.offset.lane_center_x, center, max_relative = 1e-12);
        assert_relative_eq!(report.offset.magnitude, (center - 640.0).abs(), max_relative = 1e-12);
    }

    #[test]
    fn straight_lane_is_degenerate() {
        let frame = LaneFrame::new(
            1280.0,
            720.0,
            PolynomialFit::new(0.0, 0.0, 300.0),
            PolynomialFit::new(1e-4, 0.0, 1000.0),
        )
        .expect("frame");
        assert_eq!(
            estimate_lane(&frame, UnitSystem::Meters, &ScaleFactors::default()),
            Err(LaneGeometryError::DegenerateFit {
                side: LaneSide::Left
            })
        );
    }

    #[test]
    fn from_mask_recovers_lane_layout() {
        let mask = BinaryMask::from_fn(400, 300, |x, y| {
            let bend = (y as f64 - 150.0).powi(2) * 1e-3;
            x == (80.0 + bend).round() as usize || x == (300.0 + bend).round() as usize
        });
        let frame = LaneFrame::from_mask(&mask, 50).expect("frame");
        assert_eq!(frame.image_width, 400.0);
        assert_eq!(frame.eval_ys.len(), 300);

        let report = estimate_lane(&frame, UnitSystem::Pixels, &ScaleFactors::default())
            .expect("report");
        // Lane center near x = 190 + bend(300) = 212.5, right of the vehicle at 200.
        assert_eq!(report.offset.side, VehicleSide::LeftOfCenter);
        assert!((report.offset.magnitude - 12.5).abs() < 1.0);
        // a = 1e-3 px^-1 gives a radius near 1 / (2a) = 500 px at the bottom.
        assert!(report.curvature.left > 400.0 && report.curvature.left < 800.0);
    }

    #[test]
    fn holdover_keeps_last_good_report() {
        let good = estimate_lane(&curved_frame(), UnitSystem::Meters, &ScaleFactors::default())
            .expect("report");
        let mut holdover = FrameHoldover::new();

        let first = holdover.update(Err(LaneGeometryError::EmptySample));
        assert_eq!(first, HoldoverOutcome::Empty(LaneGeometryError::EmptySample));
        assert!(first.report().is_none());

        assert_eq!(holdover.update(Ok(good)), HoldoverOutcome::Fresh(good));

        let failed = holdover.update(Err(LaneGeometryError::NonFinite));
        assert!(failed.is_held_over());
        assert_eq!(failed.report(), Some(&good));
        assert_eq!(failed.error(), Some(&LaneGeometryError::NonFinite));
        assert_eq!(holdover.consecutive_failures(), 1);

        holdover.reset();
        assert!(holdover.last().is_none());
    }

    #[test]
    fn report_renders_three_lines() {
        let report = estimate_lane(&curved_frame(), UnitSystem::Meters, &ScaleFactors::default())
            .expect("report");
        let text = report.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Left Lane Line Curvature Radius = "));
        assert!(lines[1].starts_with("Right Lane Line Curvature Radius = "));
        assert!(lines[2].starts_with("Vehicle is ") && lines[2].contains("(m)"));
    }
}
