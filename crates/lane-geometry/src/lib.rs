//! High-level facade for the `lane-geometry-*` workspace.
//!
//! This crate provides:
//! - re-exports of the estimators in `lane-geometry-core`
//! - a per-frame pipeline (mask or fitted lines in, [`LaneReport`] out) with
//!   a last-good-report holdover for noisy video sequences
//! - JSON config and report files for the `lane-geometry` CLI
//!
//! ## Quickstart
//!
//! ```
//! use lane_geometry::core::{BinaryMask, ScaleFactors, UnitSystem};
//! use lane_geometry::{estimate_lane, LaneFrame};
//!
//! # fn main() -> Result<(), lane_geometry::core::LaneGeometryError> {
//! // Two gently curving lane lines in a 400x300 bird's-eye mask.
//! let mask = BinaryMask::from_fn(400, 300, |x, y| {
//!     let bend = (y as f64 - 150.0).powi(2) * 1e-3;
//!     let left = (80.0 + bend).round() as usize;
//!     let right = (320.0 + bend).round() as usize;
//!     x == left || x == right
//! });
//!
//! let frame = LaneFrame::from_mask(&mask, 50)?;
//! let report = estimate_lane(&frame, UnitSystem::Meters, &ScaleFactors::default())?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `lane_geometry::core`: units, polynomial fits, curvature and offset
//!   estimators, masks and thresholds.
//! - `lane_geometry::pipeline`: [`LaneFrame`], [`estimate_lane`], [`FrameHoldover`].
//! - `lane_geometry::io`: JSON config, frame inputs and reports.

pub use lane_geometry_core as core;

pub mod io;
pub mod pipeline;

pub use lane_geometry_core::{
    CurvatureResult, LaneGeometryError, OffsetResult, PolynomialFit, ScaleFactors, UnitSystem,
    VehicleSide,
};
pub use pipeline::{
    estimate_lane, FrameHoldover, HoldoverOutcome, LaneFrame, LaneReport, MAX_IMAGE_ROWS,
};
