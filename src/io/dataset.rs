//! On-disk layout of an evaluation sequence.
//!
//! Expected directory structure:
//! ```text
//! <dataset>/
//!   depth/000000.npy              ground-truth depth, (H, W)
//!   depth/000001.npy
//!   flow/000000_000001_flow.npy   flow from frame 0 to frame 1, (H, W, 2)
//! <results>/
//!   00000000.npy                  predicted depth, (1, 1, H, W)
//!   00000001.npy
//! ```
//!
//! Only the roots and the two dataset sub-directory names are configurable;
//! the file name patterns are fixed.

use crate::core::{DepthMap, FlowField};
use crate::io::npy::{read_npy, NpyArray, NpyError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading sequence data.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("frame {frame}: file not found: {}", .path.display())]
    MissingFile { frame: usize, path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Npy {
        path: PathBuf,
        #[source]
        source: NpyError,
    },

    #[error("{}: expected {expected}, got shape {actual:?}", .path.display())]
    Shape {
        path: PathBuf,
        expected: &'static str,
        actual: Vec<usize>,
    },

    #[error("{}: channel {channel} out of range ({channels} channels)", .path.display())]
    Channel {
        path: PathBuf,
        channel: usize,
        channels: usize,
    },
}

/// Anything that yields a depth map per frame index.
pub trait DepthSource: Sync {
    fn load_depth(&self, frame: usize) -> Result<DepthMap, DatasetError>;

    /// Short name for logs and reports.
    fn label(&self) -> &str;
}

/// Anything that yields the flow from one frame to another.
pub trait FlowSource: Sync {
    fn load_flow(&self, from: usize, to: usize) -> Result<FlowField, DatasetError>;
}

/// Paths inside a ground-truth dataset directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    pub root: PathBuf,
    pub depth_dir: String,
    pub flow_dir: String,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            depth_dir: "depth".to_string(),
            flow_dir: "flow".to_string(),
        }
    }

    /// `<root>/depth/{frame:06}.npy`
    pub fn depth_path(&self, frame: usize) -> PathBuf {
        self.root
            .join(&self.depth_dir)
            .join(format!("{frame:06}.npy"))
    }

    /// `<root>/flow/{from:06}_{to:06}_flow.npy`
    pub fn flow_path(&self, from: usize, to: usize) -> PathBuf {
        self.root
            .join(&self.flow_dir)
            .join(format!("{from:06}_{to:06}_flow.npy"))
    }
}

/// Ground-truth depth read straight from the dataset.
#[derive(Clone, Debug)]
pub struct GroundTruthDepth {
    layout: DatasetLayout,
}

impl GroundTruthDepth {
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }
}

impl DepthSource for GroundTruthDepth {
    fn load_depth(&self, frame: usize) -> Result<DepthMap, DatasetError> {
        let path = self.layout.depth_path(frame);
        let array = load_array(frame, &path)?;
        depth_from_array(array, 0, &path)
    }

    fn label(&self) -> &str {
        "ground truth"
    }
}

impl FlowSource for DatasetLayout {
    fn load_flow(&self, from: usize, to: usize) -> Result<FlowField, DatasetError> {
        let path = self.flow_path(from, to);
        let array = load_array(from, &path)?;
        flow_from_array(array, &path)
    }
}

/// Predicted depth written by the inference program.
///
/// Predictions are stored in network units: they are multiplied by `scale`
/// and one channel of batch item 0 is kept.
#[derive(Clone, Debug)]
pub struct PredictedDepth {
    root: PathBuf,
    scale: f32,
    channel: usize,
}

impl PredictedDepth {
    /// Rescale factor from network output to dataset depth units.
    pub const DEFAULT_SCALE: f32 = 10.0;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scale: Self::DEFAULT_SCALE,
            channel: 0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// `<root>/{frame:08}.npy`
    pub fn path(&self, frame: usize) -> PathBuf {
        self.root.join(format!("{frame:08}.npy"))
    }
}

impl DepthSource for PredictedDepth {
    fn load_depth(&self, frame: usize) -> Result<DepthMap, DatasetError> {
        let path = self.path(frame);
        let array = load_array(frame, &path)?;
        let mut depth = depth_from_array(array, self.channel, &path)?;
        depth.scale(self.scale);
        Ok(depth)
    }

    fn label(&self) -> &str {
        "prediction"
    }
}

fn load_array(frame: usize, path: &Path) -> Result<NpyArray, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::MissingFile {
            frame,
            path: path.to_path_buf(),
        });
    }
    read_npy(path).map_err(|source| DatasetError::Npy {
        path: path.to_path_buf(),
        source,
    })
}

/// Extract an H×W depth map from an array shaped (H, W), (C, H, W) or
/// (N, C, H, W). For the last two, batch item 0 and `channel` are kept.
pub fn depth_from_array(
    array: NpyArray,
    channel: usize,
    path: &Path,
) -> Result<DepthMap, DatasetError> {
    let shape_err = || DatasetError::Shape {
        path: path.to_path_buf(),
        expected: "(H, W), (C, H, W) or (N, C, H, W)",
        actual: array.shape.clone(),
    };

    let (channels, height, width) = match array.shape.as_slice() {
        &[h, w] => (1, h, w),
        &[c, h, w] => (c, h, w),
        &[n, c, h, w] if n >= 1 => (c, h, w),
        _ => return Err(shape_err()),
    };
    if channel >= channels {
        return Err(DatasetError::Channel {
            path: path.to_path_buf(),
            channel,
            channels,
        });
    }
    let (w32, h32) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(shape_err()),
    };

    let plane = height * width;
    let start = channel * plane;
    let Some(data) = array.data.get(start..start + plane) else {
        return Err(shape_err());
    };
    DepthMap::from_vec(w32, h32, data.to_vec()).map_err(|_| shape_err())
}

/// Interpret an (H, W, 2) array as a flow field.
pub fn flow_from_array(array: NpyArray, path: &Path) -> Result<FlowField, DatasetError> {
    let shape_err = |actual: Vec<usize>| DatasetError::Shape {
        path: path.to_path_buf(),
        expected: "(H, W, 2)",
        actual,
    };

    let dims = match array.shape.as_slice() {
        &[h, w, 2] => Some((h, w)),
        _ => None,
    };
    let Some((height, width)) = dims else {
        return Err(shape_err(array.shape));
    };
    let (Ok(w32), Ok(h32)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(shape_err(array.shape));
    };

    FlowField::from_vec(w32, h32, array.data).map_err(|_| shape_err(vec![height, width, 2]))
}
