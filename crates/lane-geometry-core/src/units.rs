//! Pixel to metric conversion for the bird's-eye lane frame.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LaneGeometryError;

/// Meters per pixel along the image y axis (30 m of road over 720 rows).
pub const YM_PER_PIX: f64 = 30.0 / 720.0;

/// Meters per pixel along the image x axis (3.7 m lane width over 700 columns).
pub const XM_PER_PIX: f64 = 3.7 / 700.0;

/// Unit a curvature or offset report is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    Pixels,
    #[default]
    Meters,
}

impl UnitSystem {
    /// Short label used in rendered reports, e.g. `(m)`.
    pub fn suffix(&self) -> &'static str {
        match self {
            UnitSystem::Pixels => "(p)",
            UnitSystem::Meters => "(m)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Pixels => "pixels",
            UnitSystem::Meters => "meters",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = LaneGeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pixels" | "pixel" | "px" | "p" => Ok(UnitSystem::Pixels),
            "meters" | "meter" | "metres" | "m" => Ok(UnitSystem::Meters),
            _ => Err(LaneGeometryError::InvalidUnit(s.to_string())),
        }
    }
}

/// Meters-per-pixel along each image axis.
///
/// The bird's-eye frame is anisotropic: a vertical pixel covers roughly
/// eight times more road than a horizontal one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub ym_per_pix: f64,
    pub xm_per_pix: f64,
}

impl ScaleFactors {
    /// Scale of the standard lane geometry: [`YM_PER_PIX`], [`XM_PER_PIX`].
    pub const LANE_DEFAULT: ScaleFactors = ScaleFactors {
        ym_per_pix: YM_PER_PIX,
        xm_per_pix: XM_PER_PIX,
    };

    /// Derive scale factors from known physical extents of the warped frame.
    pub fn from_calibration(
        meters_y: f64,
        pixels_y: f64,
        meters_x: f64,
        pixels_x: f64,
    ) -> Result<Self, LaneGeometryError> {
        let scale = Self {
            ym_per_pix: meters_y / pixels_y,
            xm_per_pix: meters_x / pixels_x,
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Both factors must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), LaneGeometryError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.ym_per_pix) && ok(self.xm_per_pix) {
            Ok(())
        } else {
            Err(LaneGeometryError::InvalidScale {
                ym_per_pix: self.ym_per_pix,
                xm_per_pix: self.xm_per_pix,
            })
        }
    }

    #[inline]
    pub fn x_to_meters(&self, px: f64) -> f64 {
        px * self.xm_per_pix
    }

    #[inline]
    pub fn x_to_pixels(&self, meters: f64) -> f64 {
        meters / self.xm_per_pix
    }

    #[inline]
    pub fn y_to_meters(&self, px: f64) -> f64 {
        px * self.ym_per_pix
    }

    #[inline]
    pub fn y_to_pixels(&self, meters: f64) -> f64 {
        meters / self.ym_per_pix
    }
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self::LANE_DEFAULT
    }
}
