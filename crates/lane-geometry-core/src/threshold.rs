//! Colour and gradient thresholding into binary lane masks.
//!
//! Colour thresholds use half-open ranges `(lo, hi]` per channel; gradient
//! thresholds use inclusive ranges on 8-bit rescaled Sobel responses (or on
//! radians for the gradient direction). Sobel borders are reflect-101.

use serde::{Deserialize, Serialize};

use crate::{BinaryMask, ColorImage, ColorImageView, GrayImage, GrayImageView};

/// Half-open channel range `(lo, hi]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub lo: u8,
    pub hi: u8,
}

impl ChannelRange {
    /// `(0, 255]`: every non-zero value.
    pub const ANY_NONZERO: ChannelRange = ChannelRange { lo: 0, hi: 255 };

    pub const fn new(lo: u8, hi: u8) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, v: u8) -> bool {
        v > self.lo && v <= self.hi
    }
}

impl Default for ChannelRange {
    fn default() -> Self {
        Self::ANY_NONZERO
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientOrient {
    X,
    Y,
}

/// Channel of an interleaved 3-channel image: `R`/`H`, `G`/`L` or `B`/`S`
/// depending on the colour space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    First,
    Second,
    Third,
}

impl Channel {
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Channel::First => 0,
            Channel::Second => 1,
            Channel::Third => 2,
        }
    }
}

/// Sobel aperture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SobelKernel {
    #[default]
    K3,
    K5,
}

impl SobelKernel {
    fn smooth(&self) -> &'static [f64] {
        match self {
            SobelKernel::K3 => &[1.0, 2.0, 1.0],
            SobelKernel::K5 => &[1.0, 4.0, 6.0, 4.0, 1.0],
        }
    }

    fn derive(&self) -> &'static [f64] {
        match self {
            SobelKernel::K3 => &[-1.0, 0.0, 1.0],
            SobelKernel::K5 => &[-1.0, -2.0, 0.0, 2.0, 1.0],
        }
    }
}

/// Parameters for [`combined_gradient_threshold`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientThresholdParams {
    pub kernel: SobelKernel,
    /// Inclusive range on the rescaled `|∂/∂x|`.
    pub x_range: [u8; 2],
    /// Inclusive range on the rescaled `|∂/∂y|`.
    pub y_range: [u8; 2],
    /// Inclusive range on the rescaled gradient magnitude.
    pub magnitude_range: [u8; 2],
    /// Inclusive range on `atan2(|gy|, |gx|)`, radians in `[0, π/2]`.
    pub direction_range: [f64; 2],
}

impl Default for GradientThresholdParams {
    fn default() -> Self {
        Self {
            kernel: SobelKernel::K3,
            x_range: [20, 100],
            y_range: [20, 100],
            magnitude_range: [30, 100],
            direction_range: [0.7, 1.3],
        }
    }
}

// ---------------------------------------------------------------------------
// Colour space conversion
// ---------------------------------------------------------------------------

/// Luma with the ITU-R BT.601 weights.
pub fn rgb_to_gray(rgb: &ColorImageView<'_>) -> GrayImage {
    let data = rgb
        .data
        .chunks_exact(3)
        .map(|p| {
            let y = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect();
    GrayImage {
        width: rgb.width,
        height: rgb.height,
        data,
    }
}

/// RGB to 8-bit HLS: `H` in `[0, 180)` (degrees / 2), `L` and `S` in `[0, 255]`.
pub fn rgb_to_hls(rgb: &ColorImageView<'_>) -> ColorImage {
    let mut data = Vec::with_capacity(rgb.data.len());
    for p in rgb.data.chunks_exact(3) {
        data.extend_from_slice(&hls_pixel(p[0], p[1], p[2]));
    }
    ColorImage {
        width: rgb.width,
        height: rgb.height,
        data,
    }
}

fn hls_pixel(r: u8, g: u8, b: u8) -> [u8; 3] {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let vmax = r.max(g).max(b);
    let vmin = r.min(g).min(b);
    let l = 0.5 * (vmax + vmin);
    let diff = vmax - vmin;

    let (h, s) = if diff > f64::EPSILON {
        let s = if l < 0.5 {
            diff / (vmax + vmin)
        } else {
            diff / (2.0 - vmax - vmin)
        };
        let mut h = if vmax == r {
            60.0 * (g - b) / diff
        } else if vmax == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        (h, s)
    } else {
        (0.0, 0.0)
    };

    [
        to_u8(h / 2.0).min(179),
        to_u8(l * 255.0),
        to_u8(s * 255.0),
    ]
}

#[inline]
fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ---------------------------------------------------------------------------
// Colour thresholds
// ---------------------------------------------------------------------------

pub fn gray_threshold(gray: &GrayImageView<'_>, range: ChannelRange) -> BinaryMask {
    let data = gray.data.iter().map(|&v| u8::from(range.contains(v))).collect();
    BinaryMask {
        width: gray.width,
        height: gray.height,
        data,
    }
}

/// Threshold a single channel of a 3-channel image.
pub fn channel_threshold(
    img: &ColorImageView<'_>,
    channel: Channel,
    range: ChannelRange,
) -> BinaryMask {
    let c = channel.index();
    let data = img
        .data
        .chunks_exact(3)
        .map(|p| u8::from(range.contains(p[c])))
        .collect();
    BinaryMask {
        width: img.width,
        height: img.height,
        data,
    }
}

/// Pixels whose three channels all fall in their respective ranges.
pub fn rgb_threshold(rgb: &ColorImageView<'_>, ranges: [ChannelRange; 3]) -> BinaryMask {
    all_channels_threshold(rgb, ranges)
}

/// Convert to HLS and keep pixels whose `H`, `L`, `S` all fall in range.
pub fn hls_threshold(rgb: &ColorImageView<'_>, ranges: [ChannelRange; 3]) -> BinaryMask {
    let hls = rgb_to_hls(rgb);
    all_channels_threshold(&hls.view(), ranges)
}

fn all_channels_threshold(img: &ColorImageView<'_>, ranges: [ChannelRange; 3]) -> BinaryMask {
    let data = img
        .data
        .chunks_exact(3)
        .map(|p| u8::from((0..3).all(|c| ranges[c].contains(p[c]))))
        .collect();
    BinaryMask {
        width: img.width,
        height: img.height,
        data,
    }
}

// ---------------------------------------------------------------------------
// Gradient thresholds
// ---------------------------------------------------------------------------

#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Separable Sobel derivative along `orient`.
fn sobel(gray: &GrayImageView<'_>, orient: GradientOrient, kernel: SobelKernel) -> Vec<f64> {
    let (kx, ky) = match orient {
        GradientOrient::X => (kernel.derive(), kernel.smooth()),
        GradientOrient::Y => (kernel.smooth(), kernel.derive()),
    };
    let (w, h) = (gray.width, gray.height);
    let r = (kx.len() / 2) as isize;

    let mut tmp = vec![0.0f64; w * h];
    for y in 0..h {
        let row = &gray.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &c) in kx.iter().enumerate() {
                acc += c * row[reflect101(x as isize + k as isize - r, w)] as f64;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0.0f64; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &c) in ky.iter().enumerate() {
                acc += c * tmp[reflect101(y as isize + k as isize - r, h) * w + x];
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Rescale non-negative values so the maximum maps to 255 (truncating).
fn rescale_to_u8(values: &[f64]) -> Vec<u8> {
    let max = values.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|&v| (255.0 * v / max).clamp(0.0, 255.0) as u8)
        .collect()
}

fn inclusive_mask(width: usize, height: usize, values: &[u8], range: [u8; 2]) -> BinaryMask {
    let data = values
        .iter()
        .map(|&v| u8::from(v >= range[0] && v <= range[1]))
        .collect();
    BinaryMask {
        width,
        height,
        data,
    }
}

/// Threshold the rescaled absolute Sobel derivative along one axis.
pub fn abs_sobel_threshold(
    gray: &GrayImageView<'_>,
    orient: GradientOrient,
    kernel: SobelKernel,
    range: [u8; 2],
) -> BinaryMask {
    let abs: Vec<f64> = sobel(gray, orient, kernel).iter().map(|v| v.abs()).collect();
    inclusive_mask(gray.width, gray.height, &rescale_to_u8(&abs), range)
}

/// Threshold the rescaled gradient magnitude `sqrt(gx² + gy²)`.
pub fn gradient_magnitude_threshold(
    gray: &GrayImageView<'_>,
    kernel: SobelKernel,
    range: [u8; 2],
) -> BinaryMask {
    let gx = sobel(gray, GradientOrient::X, kernel);
    let gy = sobel(gray, GradientOrient::Y, kernel);
    magnitude_mask(gray, &gx, &gy, range)
}

fn magnitude_mask(
    gray: &GrayImageView<'_>,
    gx: &[f64],
    gy: &[f64],
    range: [u8; 2],
) -> BinaryMask {
    let mag: Vec<f64> = gx.iter().zip(gy).map(|(x, y)| x.hypot(*y)).collect();
    inclusive_mask(gray.width, gray.height, &rescale_to_u8(&mag), range)
}

/// Threshold the gradient direction `atan2(|gy|, |gx|)`.
///
/// Flat regions (zero gradient) have direction `0`.
pub fn gradient_direction_threshold(
    gray: &GrayImageView<'_>,
    kernel: SobelKernel,
    range: [f64; 2],
) -> BinaryMask {
    let gx = sobel(gray, GradientOrient::X, kernel);
    let gy = sobel(gray, GradientOrient::Y, kernel);
    direction_mask(gray, &gx, &gy, range)
}

fn direction_mask(
    gray: &GrayImageView<'_>,
    gx: &[f64],
    gy: &[f64],
    range: [f64; 2],
) -> BinaryMask {
    let data = gx
        .iter()
        .zip(gy)
        .map(|(x, y)| {
            let dir = y.abs().atan2(x.abs());
            u8::from(dir >= range[0] && dir <= range[1])
        })
        .collect();
    BinaryMask {
        width: gray.width,
        height: gray.height,
        data,
    }
}

/// `(x ∧ y) ∨ (magnitude ∧ direction)` gradient mask.
pub fn combined_gradient_threshold(
    gray: &GrayImageView<'_>,
    params: &GradientThresholdParams,
) -> BinaryMask {
    let gx = sobel(gray, GradientOrient::X, params.kernel);
    let gy = sobel(gray, GradientOrient::Y, params.kernel);

    let abs_x: Vec<f64> = gx.iter().map(|v| v.abs()).collect();
    let abs_y: Vec<f64> = gy.iter().map(|v| v.abs()).collect();
    let grad_x = inclusive_mask(gray.width, gray.height, &rescale_to_u8(&abs_x), params.x_range);
    let grad_y = inclusive_mask(gray.width, gray.height, &rescale_to_u8(&abs_y), params.y_range);
    let mag = magnitude_mask(gray, &gx, &gy, params.magnitude_range);
    let dir = direction_mask(gray, &gx, &gy, params.direction_range);

    grad_x.and(&grad_y).or(&mag.and(&dir))
}
