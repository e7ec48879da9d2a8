//! Evaluation settings.
//!
//! Every field has a default, so a JSON config only needs the keys it changes:
//!
//! ```json
//! {
//!   "dataset_root": "data/office/Easy/P000",
//!   "results_root": "results/office",
//!   "num_pairs": 29,
//!   "device": { "kind": "parallel", "threads": 8 }
//! }
//! ```

use crate::core::IntrinsicsPolicy;
use crate::eval::{Device, FrameRange};
use crate::io::dataset::{DatasetLayout, PredictedDepth};
use crate::render::RasterSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Ground-truth dataset directory (holds `depth_dir` and `flow_dir`)
    pub dataset_root: PathBuf,
    pub depth_dir: String,
    pub flow_dir: String,

    /// Directory of predicted depth `.npy` files
    pub results_root: PathBuf,

    /// First frame of the first pair
    pub start_frame: usize,

    /// Number of adjacent pairs to evaluate
    pub num_pairs: usize,

    /// Multiplier from prediction units to dataset depth units
    pub prediction_scale: f32,

    /// Channel kept from a batched prediction
    pub prediction_channel: usize,

    pub intrinsics: IntrinsicsPolicy,
    pub raster: RasterSettings,
    pub device: Device,

    /// Fail on an empty validity mask instead of warning
    pub strict: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let frames = FrameRange::default();
        let layout = DatasetLayout::new(".");
        Self {
            dataset_root: layout.root,
            depth_dir: layout.depth_dir,
            flow_dir: layout.flow_dir,
            results_root: PathBuf::from("results"),
            start_frame: frames.start,
            num_pairs: frames.pairs,
            prediction_scale: PredictedDepth::DEFAULT_SCALE,
            prediction_channel: 0,
            intrinsics: IntrinsicsPolicy::default(),
            raster: RasterSettings::default(),
            device: Device::default(),
            strict: false,
        }
    }
}

impl EvalConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would silently produce a meaningless metric.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_pairs == 0 {
            return Err(ConfigError::Invalid("num_pairs must be at least 1".into()));
        }
        if !(self.prediction_scale.is_finite() && self.prediction_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "prediction_scale must be a positive number, got {}",
                self.prediction_scale
            )));
        }
        if let Some(r) = self.raster.radius_ndc {
            if !(r.is_finite() && r > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "raster.radius_ndc must be positive, got {r}"
                )));
            }
        }
        if self.raster.points_per_pixel != 1 {
            return Err(ConfigError::Invalid(format!(
                "raster.points_per_pixel must be 1, got {}",
                self.raster.points_per_pixel
            )));
        }
        if let IntrinsicsPolicy::Fixed(k) = self.intrinsics {
            if k.fx == 0.0 || k.fy == 0.0 {
                return Err(ConfigError::Invalid("focal lengths must be non-zero".into()));
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> DatasetLayout {
        DatasetLayout {
            root: self.dataset_root.clone(),
            depth_dir: self.depth_dir.clone(),
            flow_dir: self.flow_dir.clone(),
        }
    }

    pub fn frames(&self) -> FrameRange {
        FrameRange::new(self.start_frame, self.num_pairs)
    }
}
