//! Lateral offset of the vehicle from the lane center.
//!
//! The camera is assumed to be mounted on the vehicle centerline, so the
//! vehicle sits at the horizontal middle of the frame. Both lane lines are
//! evaluated at the bottom row (`y = image_height`).

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{LaneGeometryError, PolynomialFit, ScaleFactors, UnitSystem};

/// Which side of the lane center the vehicle is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleSide {
    LeftOfCenter,
    RightOfCenter,
}

impl VehicleSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleSide::LeftOfCenter => "left of center",
            VehicleSide::RightOfCenter => "right of center",
        }
    }
}

impl fmt::Display for VehicleSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle offset from the lane center for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffsetResult {
    /// Unsigned distance between vehicle and lane center, in `unit`.
    pub magnitude: f64,
    pub unit: UnitSystem,
    pub side: VehicleSide,
    /// Vehicle position in pixels (frame center column).
    pub vehicle_x: f64,
    /// Lane center at the bottom row, in pixels.
    pub lane_center_x: f64,
}

impl fmt::Display for OffsetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Vehicle is {:.2} {} {}",
            self.magnitude,
            self.unit.suffix(),
            self.side
        )
    }
}

/// Estimate the offset using the standard lane scale ([`ScaleFactors::LANE_DEFAULT`]).
pub fn estimate_offset(
    image_width: f64,
    image_height: f64,
    left: PolynomialFit,
    right: PolynomialFit,
    unit: UnitSystem,
) -> Result<OffsetResult, LaneGeometryError> {
    estimate_offset_with_scale(
        image_width,
        image_height,
        left,
        right,
        unit,
        &ScaleFactors::LANE_DEFAULT,
    )
}

/// Estimate the offset with explicit scale factors.
///
/// Only the horizontal factor applies: the offset is a purely horizontal
/// distance. The side is decided on raw pixel positions; a vehicle exactly
/// on the lane center is reported as [`VehicleSide::RightOfCenter`].
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(scale)))]
pub fn estimate_offset_with_scale(
    image_width: f64,
    image_height: f64,
    left: PolynomialFit,
    right: PolynomialFit,
    unit: UnitSystem,
    scale: &ScaleFactors,
) -> Result<OffsetResult, LaneGeometryError> {
    scale.validate()?;
    if !image_width.is_finite() || !image_height.is_finite() {
        return Err(LaneGeometryError::NonFinite);
    }
    if image_width <= 0.0 || image_height <= 0.0 {
        return Err(LaneGeometryError::InvalidImageSize {
            width: image_width,
            height: image_height,
        });
    }
    if !left.is_finite() || !right.is_finite() {
        return Err(LaneGeometryError::NonFinite);
    }

    let vehicle_x = image_width / 2.0;
    let left_x = left.eval(image_height);
    let right_x = right.eval(image_height);
    let lane_center_x = (left_x + right_x) / 2.0;

    let distance_px = (vehicle_x - lane_center_x).abs();
    let magnitude = match unit {
        UnitSystem::Pixels => distance_px,
        UnitSystem::Meters => scale.x_to_meters(distance_px),
    };

    let side = if lane_center_x > vehicle_x {
        VehicleSide::LeftOfCenter
    } else {
        VehicleSide::RightOfCenter
    };

    debug!(
        "offset: left_x={:.1} right_x={:.1} center={:.1} vehicle={:.1} -> {:.3} {} {}",
        left_x,
        right_x,
        lane_center_x,
        vehicle_x,
        magnitude,
        unit.suffix(),
        side
    );

    Ok(OffsetResult {
        magnitude,
        unit,
        side,
        vehicle_x,
        lane_center_x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{XM_PER_PIX, YM_PER_PIX};
    use approx::assert_relative_eq;

    #[test]
    fn reference_frame_is_left_of_center() {
        let left = PolynomialFit::new(0.0, 0.0, 300.0);
        let right = PolynomialFit::new(0.0, 0.0, 1000.0);
        let res = estimate_offset(1280.0, 720.0, left, right, UnitSystem::Pixels).expect("offset");

        assert_eq!(res.vehicle_x, 640.0);
        assert_eq!(res.lane_center_x, 650.0);
        assert_relative_eq!(res.magnitude, 10.0);
        assert_eq!(res.side, VehicleSide::LeftOfCenter);
    }

    #[test]
    fn centered_vehicle_has_zero_offset_and_right_label() {
        let left = PolynomialFit::new(0.0, 0.0, 280.0);
        let right = PolynomialFit::new(0.0, 0.0, 1000.0);
        for unit in [UnitSystem::Pixels, UnitSystem::Meters] {
            let res = estimate_offset(1280.0, 720.0, left, right, unit).expect("offset");
            assert_eq!(res.magnitude, 0.0);
            assert_eq!(res.side, VehicleSide::RightOfCenter);
        }
    }

    #[test]
    fn evaluates_lines_at_bottom_row() {
        // Lines converge toward the top; only y = height matters.
        let left = PolynomialFit::new(1e-4, 0.1, 100.0);
        let right = PolynomialFit::new(-1e-4, -0.1, 1100.0);
        let res = estimate_offset(1280.0, 720.0, left, right, UnitSystem::Pixels).expect("offset");
        let expected_center = (left.eval(720.0) + right.eval(720.0)) / 2.0;
        assert_relative_eq!(res.lane_center_x, expected_center);
        assert_relative_eq!(res.magnitude, (640.0 - expected_center).abs());
    }

    #[test]
    fn meters_scale_only_horizontally_and_keep_side() {
        let left = PolynomialFit::new(0.0, 0.0, 200.0);
        let right = PolynomialFit::new(0.0, 0.0, 900.0);
        let px = estimate_offset(1280.0, 720.0, left, right, UnitSystem::Pixels).expect("px");
        let m = estimate_offset(1280.0, 720.0, left, right, UnitSystem::Meters).expect("m");

        assert_relative_eq!(px.magnitude, 90.0);
        assert_eq!(px.side, VehicleSide::RightOfCenter);
        assert_eq!(m.side, px.side);
        assert_relative_eq!(m.magnitude, 90.0 * 3.7 / 700.0, max_relative = 1e-12);

        let back = ScaleFactors::LANE_DEFAULT.x_to_pixels(m.magnitude);
        assert_relative_eq!(back, px.magnitude, max_relative = 1e-12);
    }

    #[test]
    fn rejects_bad_geometry() {
        let fit = PolynomialFit::new(0.0, 0.0, 300.0);
        assert_eq!(
            estimate_offset(0.0, 720.0, fit, fit, UnitSystem::Pixels),
            Err(LaneGeometryError::InvalidImageSize {
                width: 0.0,
                height: 720.0
            })
        );
        assert_eq!(
            estimate_offset(f64::NAN, 720.0, fit, fit, UnitSystem::Pixels),
            Err(LaneGeometryError::NonFinite)
        );
        let bad = PolynomialFit::new(f64::NAN, 0.0, 0.0);
        assert_eq!(
            estimate_offset(1280.0, 720.0, bad, fit, UnitSystem::Pixels),
            Err(LaneGeometryError::NonFinite)
        );
    }

    #[test]
    fn negative_or_nan_scale_is_rejected() {
        let left = PolynomialFit::new(0.0, 0.0, 300.0);
        let right = PolynomialFit::new(0.0, 0.0, 1000.0);
        for xm in [-XM_PER_PIX, f64::NAN] {
            let scale = ScaleFactors {
                ym_per_pix: YM_PER_PIX,
                xm_per_pix: xm,
            };
            let res =
                estimate_offset_with_scale(1280.0, 720.0, left, right, UnitSystem::Meters, &scale);
            assert!(matches!(res, Err(LaneGeometryError::InvalidScale { .. })));
        }
    }

    #[test]
    fn renders_distance_and_side() {
        let res = OffsetResult {
            magnitude: 0.0528,
            unit: UnitSystem::Meters,
            side: VehicleSide::LeftOfCenter,
            vehicle_x: 640.0,
            lane_center_x: 650.0,
        };
        assert_eq!(res.to_string(), "Vehicle is 0.05 (m) left of center");
    }
}
