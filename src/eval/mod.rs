//! Evaluation pipeline.
//!
//! - `warp`: per-pair depth warping (mask + delta depth)
//! - `sequence`: run the warper over a frame range for one depth source
//! - `metric`: TEPE over the ground-truth and predicted sequences
//!
//! [`evaluate_sources`] ties the three together.

pub mod metric;
pub mod sequence;
pub mod warp;

pub use metric::{evaluate, tepe, PairReport, TepeReport};
pub use sequence::{Device, FrameRange, SequenceDriver, WarpedPair, WarpedSequence};
pub use warp::{flow_point_cloud, DepthWarper, ShapeMismatch, WarpResult};

use crate::config::EvalConfig;
use crate::io::dataset::{DatasetError, DepthSource, FlowSource, GroundTruthDepth, PredictedDepth};
use crate::render::{CpuPointRasterizer, Rasterizer};
use thiserror::Error;

/// Errors that can occur while evaluating a sequence.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("frame {frame}: {source}")]
    Shape {
        frame: usize,
        #[source]
        source: ShapeMismatch,
    },

    #[error("frame {frame}: validity mask is empty (no point rasterized into the frame)")]
    DegenerateMask { frame: usize },

    #[error("nothing to evaluate (empty sequence)")]
    EmptySequence,

    #[error("sequence lengths differ: gt {gt}, pred {pred}, mask {mask}")]
    LengthMismatch { gt: usize, pred: usize, mask: usize },

    #[error("ground truth has {gt} frame pairs, prediction has {pred}")]
    PairCountMismatch { gt: usize, pred: usize },

    #[error("frame order differs: ground truth at frame {gt}, prediction at frame {pred}")]
    FrameOrder { gt: usize, pred: usize },

    #[error("frame {frame}: ground truth is {gt:?}, prediction is {pred:?} (height, width)")]
    ResolutionMismatch {
        frame: usize,
        gt: (u32, u32),
        pred: (u32, u32),
    },
}

/// Everything one evaluation produces.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub report: TepeReport,
    pub ground_truth: WarpedSequence,
    pub prediction: WarpedSequence,
}

/// Warp both depth sources over `frames` and compare them.
pub fn evaluate_sources<R: Rasterizer>(
    warper: &DepthWarper<R>,
    ground_truth: &dyn DepthSource,
    prediction: &dyn DepthSource,
    flow: &dyn FlowSource,
    frames: FrameRange,
    device: Device,
    strict: bool,
) -> Result<Evaluation, EvalError> {
    let driver = SequenceDriver::new(warper, device).strict(strict);
    let gt = driver.run(ground_truth, flow, frames)?;
    let pred = driver.run(prediction, flow, frames)?;
    let report = evaluate(&gt, &pred)?;

    log::info!(
        "TEPE over {} pairs: {:.6} ({} of {} pixels valid)",
        report.pairs.len(),
        report.tepe,
        report.valid_pixels,
        report.total_pixels
    );

    Ok(Evaluation {
        report,
        ground_truth: gt,
        prediction: pred,
    })
}

/// Evaluate the on-disk dataset and predictions described by `config`.
pub fn run(config: &EvalConfig) -> Result<Evaluation, EvalError> {
    let layout = config.layout();
    let gt = GroundTruthDepth::new(layout.clone());
    let pred = PredictedDepth::new(&config.results_root)
        .with_scale(config.prediction_scale)
        .with_channel(config.prediction_channel);
    let warper = DepthWarper::new(CpuPointRasterizer::new(), config.intrinsics, config.raster);

    evaluate_sources(
        &warper,
        &gt,
        &pred,
        &layout,
        config.frames(),
        config.device,
        config.strict,
    )
}
