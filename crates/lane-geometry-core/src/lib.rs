//! Core types and estimators for lane-line geometry.
//!
//! This crate is intentionally small and purely geometric. It consumes a
//! bird's-eye binary lane mask (or already fitted lane polynomials) and
//! produces radius of curvature and vehicle offset reports. It does *not*
//! read images, calibrate cameras or derive perspective transforms.
//!
//! ## Quickstart
//!
//! ```
//! use lane_geometry_core::{estimate_curvature, estimate_offset, PolynomialFit, UnitSystem};
//!
//! # fn main() -> Result<(), lane_geometry_core::LaneGeometryError> {
//! let left = PolynomialFit::new(2.0e-4, -0.3, 380.0);
//! let right = PolynomialFit::new(2.1e-4, -0.31, 1010.0);
//! let ys: Vec<f64> = (0..720).map(f64::from).collect();
//!
//! let curvature = estimate_curvature(&ys, left, right, UnitSystem::Meters)?;
//! let offset = estimate_offset(1280.0, 720.0, left, right, UnitSystem::Meters)?;
//! println!("{curvature}\n{offset}");
//! # Ok(())
//! # }
//! ```

mod curvature;
mod error;
mod lane_pixels;
mod logger;
mod mask;
mod offset;
mod polynomial;
mod threshold;
mod units;

pub use curvature::{
    estimate_curvature, estimate_curvature_with_scale, radius_of_curvature, CurvatureResult,
};
pub use error::{LaneGeometryError, LaneSide};
pub use lane_pixels::{fit_lane_lines, split_lane_pixels, LaneFits, LanePixels};
pub use mask::{BinaryMask, ColorImage, ColorImageView, GrayImage, GrayImageView};
pub use offset::{estimate_offset, estimate_offset_with_scale, OffsetResult, VehicleSide};
pub use polynomial::{fit_polynomial, FitError, PolynomialFit};
pub use threshold::{
    abs_sobel_threshold, channel_threshold, combined_gradient_threshold,
    gradient_direction_threshold, gradient_magnitude_threshold, gray_threshold, hls_threshold,
    rgb_threshold, rgb_to_gray, rgb_to_hls, Channel, ChannelRange, GradientOrient,
    GradientThresholdParams, SobelKernel,
};
pub use units::{ScaleFactors, UnitSystem, XM_PER_PIX, YM_PER_PIX};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, init_tracing_with_default};

pub use logger::init_with_level;
