//! JSON configuration, frame inputs and reports for lane estimation runs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::core::{
    combined_gradient_threshold, BinaryMask, GradientThresholdParams, GrayImageView,
    LaneGeometryError, PolynomialFit, ScaleFactors, UnitSystem,
};
use crate::pipeline::{estimate_lane, FrameHoldover, LaneFrame, LaneReport};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_min_lane_pixels() -> usize {
    50
}

/// Settings shared by every frame of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometryConfig {
    #[serde(default)]
    pub unit: UnitSystem,
    /// Overrides [`ScaleFactors::LANE_DEFAULT`] when set.
    #[serde(default)]
    pub scale: Option<ScaleFactors>,
    /// Gradient thresholds for frames given as grayscale images.
    #[serde(default)]
    pub threshold: GradientThresholdParams,
    /// Minimum set pixels per lane side for mask and image frames.
    #[serde(default = "default_min_lane_pixels")]
    pub min_lane_pixels: usize,
}

impl Default for LaneGeometryConfig {
    fn default() -> Self {
        Self {
            unit: UnitSystem::default(),
            scale: None,
            threshold: GradientThresholdParams::default(),
            min_lane_pixels: default_min_lane_pixels(),
        }
    }
}

impl LaneGeometryConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Scale factors in effect for this config.
    pub fn scale(&self) -> ScaleFactors {
        self.scale.unwrap_or(ScaleFactors::LANE_DEFAULT)
    }
}

/// Lane data of one input frame.
///
/// Frames carry either fitted lines, a binary bird's-eye mask (`0` / non-zero
/// bytes), or a grayscale bird's-eye image that is thresholded with
/// [`LaneGeometryConfig::threshold`]. Buffers are row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameLanes {
    Fitted {
        left_fit: PolynomialFit,
        right_fit: PolynomialFit,
    },
    Mask {
        mask: Vec<u8>,
    },
    Gray {
        gray: Vec<u8>,
    },
}

/// One frame of a [`FramesFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub image_width: f64,
    pub image_height: f64,
    /// Rows the fits are valid over; defaults to every image row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_ys: Option<Vec<f64>>,
    #[serde(flatten)]
    pub lanes: FrameLanes,
}

impl FrameInput {
    /// Frame with already fitted lane lines.
    pub fn fitted(
        image_width: f64,
        image_height: f64,
        left_fit: PolynomialFit,
        right_fit: PolynomialFit,
    ) -> Self {
        Self {
            image_width,
            image_height,
            eval_ys: None,
            lanes: FrameLanes::Fitted {
                left_fit,
                right_fit,
            },
        }
    }

    /// Resolve this input into fitted lane lines.
    ///
    /// Fitted frames with their own `eval_ys` use those rows as given; all
    /// other frames need a height [`LaneFrame::new`] accepts.
    pub fn to_lane_frame(
        &self,
        config: &LaneGeometryConfig,
    ) -> Result<LaneFrame, LaneGeometryError> {
        let frame = match &self.lanes {
            FrameLanes::Fitted {
                left_fit,
                right_fit,
            } => match &self.eval_ys {
                Some(ys) => LaneFrame::with_samples(
                    self.image_width,
                    self.image_height,
                    ys.clone(),
                    *left_fit,
                    *right_fit,
                ),
                None => {
                    LaneFrame::new(self.image_width, self.image_height, *left_fit, *right_fit)?
                }
            },
            FrameLanes::Mask { mask } => {
                let (w, h) = self.buffer_size(mask.len())?;
                let mask = BinaryMask::from_raw(w, h, mask.clone())
                    .ok_or_else(|| self.size_error())?;
                LaneFrame::from_mask(&mask, config.min_lane_pixels)?
            }
            FrameLanes::Gray { gray } => {
                let (width, height) = self.buffer_size(gray.len())?;
                let view = GrayImageView {
                    width,
                    height,
                    data: gray,
                };
                let mask = combined_gradient_threshold(&view, &config.threshold);
                LaneFrame::from_mask(&mask, config.min_lane_pixels)?
            }
        };
        Ok(match &self.eval_ys {
            Some(ys) => frame.with_eval_ys(ys.clone()),
            None => frame,
        })
    }

    fn buffer_size(&self, len: usize) -> Result<(usize, usize), LaneGeometryError> {
        let (w, h) = (self.image_width, self.image_height);
        if !(w >= 1.0 && h >= 1.0) || w.fract() != 0.0 || h.fract() != 0.0 {
            return Err(self.size_error());
        }
        let (w, h) = (w as usize, h as usize);
        if w.checked_mul(h) != Some(len) {
            return Err(self.size_error());
        }
        Ok((w, h))
    }

    fn size_error(&self) -> LaneGeometryError {
        LaneGeometryError::InvalidImageSize {
            width: self.image_width,
            height: self.image_height,
        }
    }
}

/// A sequence of frames to process in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesFile {
    pub frames: Vec<FrameInput>,
}

impl FramesFile {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Outcome for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub index: usize,
    /// Report for this frame, or the held-over one when it failed.
    #[serde(default)]
    pub report: Option<LaneReport>,
    #[serde(default)]
    pub held_over: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneReportFile {
    #[serde(default)]
    pub config_path: Option<String>,
    pub unit: UnitSystem,
    pub frames: Vec<FrameReport>,
}

impl LaneReportFile {
    /// Process `frames` in order, holding the last good report over failed frames.
    pub fn run(
        config: &LaneGeometryConfig,
        config_path: Option<&Path>,
        frames: &FramesFile,
    ) -> Self {
        let scale = config.scale();
        let mut holdover = FrameHoldover::new();
        let reports = frames
            .frames
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let result = input
                    .to_lane_frame(config)
                    .and_then(|frame| estimate_lane(&frame, config.unit, &scale));
                let outcome = holdover.update(result);
                FrameReport {
                    index,
                    report: outcome.report().copied(),
                    held_over: outcome.is_held_over(),
                    error: outcome.error().map(|e| e.to_string()),
                }
            })
            .collect();

        Self {
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            unit: config.unit,
            frames: reports,
        }
    }

    /// Frames that failed, whether or not a report was held over.
    pub fn failed_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.error.is_some()).count()
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Default report location next to the frames file: `<stem>_report.json`.
pub fn default_report_path(frames_path: &Path) -> PathBuf {
    let stem = frames_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lanes".to_string());
    frames_path.with_file_name(format!("{stem}_report.json"))
}
