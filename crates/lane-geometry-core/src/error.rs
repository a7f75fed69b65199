use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FitError;

/// Which of the two lane lines a value or error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneSide {
    Left,
    Right,
}

impl fmt::Display for LaneSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LaneSide::Left => "left",
            LaneSide::Right => "right",
        })
    }
}

/// Errors produced by the lane geometry estimators.
///
/// Every variant is local to one frame; callers are expected to skip the
/// frame (or hold over the previous report) and keep going.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LaneGeometryError {
    #[error("{side} lane fit is degenerate: quadratic coefficient is zero, curvature undefined")]
    DegenerateFit { side: LaneSide },

    #[error("unknown unit system {0:?} (expected \"pixels\" or \"meters\")")]
    InvalidUnit(String),

    #[error("no y samples to evaluate curvature at")]
    EmptySample,

    #[error("non-finite input (NaN or infinite coefficient, sample or dimension)")]
    NonFinite,

    #[error("invalid image size (width={width}, height={height})")]
    InvalidImageSize { width: f64, height: f64 },

    #[error("invalid scale factors (ym_per_pix={ym_per_pix}, xm_per_pix={xm_per_pix}); both must be finite and positive")]
    InvalidScale { ym_per_pix: f64, xm_per_pix: f64 },

    #[error("{side} lane has {found} pixels, need at least {needed}")]
    NotEnoughLanePixels {
        side: LaneSide,
        found: usize,
        needed: usize,
    },

    #[error(transparent)]
    Fit(#[from] FitError),
}
