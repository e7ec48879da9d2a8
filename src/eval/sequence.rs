//! Sequence driver: warp every adjacent frame pair of one depth source.

use super::warp::{DepthWarper, WarpResult};
use super::EvalError;
use crate::core::DepthMap;
use crate::io::dataset::{DepthSource, FlowSource};
use crate::render::Rasterizer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Where frame pairs are processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Device {
    /// One pair after another on the calling thread.
    #[default]
    Cpu,

    /// Pairs spread over a dedicated rayon pool. `threads = 0` lets rayon pick.
    Parallel { threads: usize },
}

/// Adjacent pairs `(k, k + 1)` for `k` in `start .. start + pairs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub pairs: usize,
}

impl FrameRange {
    pub fn new(start: usize, pairs: usize) -> Self {
        Self { start, pairs }
    }

    /// `(previous, current)` frame indices in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> {
        let start = self.start;
        (start..start + self.pairs).map(|k| (k, k + 1))
    }

    /// Number of frames touched (`pairs + 1`, or 0 when empty).
    pub fn frames(&self) -> usize {
        if self.pairs == 0 {
            0
        } else {
            self.pairs + 1
        }
    }
}

impl Default for FrameRange {
    /// 29 pairs covering frames 0..=29.
    fn default() -> Self {
        Self::new(0, 29)
    }
}

/// Mask and delta depth of one frame pair.
#[derive(Clone, Debug)]
pub struct WarpedPair {
    pub prev_frame: usize,
    pub frame: usize,
    pub mask: DepthMap,
    pub delta: DepthMap,
    pub valid_pixels: usize,
}

impl WarpedPair {
    /// No previous-frame point reached the current view.
    pub fn is_degenerate(&self) -> bool {
        self.valid_pixels == 0
    }

    pub fn total_pixels(&self) -> usize {
        self.mask.len()
    }
}

/// Per-pair results of one source, in frame order.
#[derive(Clone, Debug, Default)]
pub struct WarpedSequence {
    pub label: String,
    pub pairs: Vec<WarpedPair>,
}

impl WarpedSequence {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Delta-depth maps concatenated along the frame axis.
    pub fn concat_deltas(&self) -> Vec<f32> {
        self.pairs
            .iter()
            .flat_map(|p| p.delta.as_slice().iter().copied())
            .collect()
    }

    /// Validity masks concatenated along the frame axis.
    pub fn concat_masks(&self) -> Vec<f32> {
        self.pairs
            .iter()
            .flat_map(|p| p.mask.as_slice().iter().copied())
            .collect()
    }
}

/// Runs a [`DepthWarper`] over a frame range.
pub struct SequenceDriver<'a, R> {
    warper: &'a DepthWarper<R>,
    device: Device,
    strict: bool,
}

impl<'a, R: Rasterizer> SequenceDriver<'a, R> {
    pub fn new(warper: &'a DepthWarper<R>, device: Device) -> Self {
        Self {
            warper,
            device,
            strict: false,
        }
    }

    /// Treat an all-zero validity mask as an error instead of a warning.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn run(
        &self,
        depth: &dyn DepthSource,
        flow: &dyn FlowSource,
        frames: FrameRange,
    ) -> Result<WarpedSequence, EvalError> {
        if frames.pairs == 0 {
            return Err(EvalError::EmptySequence);
        }

        log::info!(
            "Warping {} frame pairs of {} (frames {}..={})",
            frames.pairs,
            depth.label(),
            frames.start,
            frames.start + frames.pairs
        );

        let pairs: Vec<(usize, usize)> = frames.iter().collect();
        let warped = match self.thread_pool() {
            Some(pool) => pool.install(|| {
                pairs
                    .par_iter()
                    .map(|&(prev, cur)| self.warp_pair(depth, flow, prev, cur))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => pairs
                .iter()
                .map(|&(prev, cur)| self.warp_pair(depth, flow, prev, cur))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let degenerate = warped.iter().filter(|p| p.is_degenerate()).count();
        if degenerate > 0 {
            log::warn!(
                "{}: {} of {} frame pairs have an empty validity mask",
                depth.label(),
                degenerate,
                warped.len()
            );
        }

        Ok(WarpedSequence {
            label: depth.label().to_string(),
            pairs: warped,
        })
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        match self.device {
            Device::Cpu => None,
            Device::Parallel { threads } => {
                pool_or_sequential(rayon::ThreadPoolBuilder::new().num_threads(threads).build())
            }
        }
    }

    fn warp_pair(
        &self,
        source: &dyn DepthSource,
        flows: &dyn FlowSource,
        prev: usize,
        cur: usize,
    ) -> Result<WarpedPair, EvalError> {
        let depth_prev = source.load_depth(prev)?;
        let depth = source.load_depth(cur)?;
        let flow = flows.load_flow(prev, cur)?;

        let WarpResult { mask, delta } = self
            .warper
            .delta_depth(&depth, &depth_prev, &flow)
            .map_err(|source| EvalError::Shape { frame: cur, source })?;

        let valid_pixels = mask.count_positive();
        log::debug!(
            "pair {}->{}: {}/{} valid pixels",
            prev,
            cur,
            valid_pixels,
            mask.len()
        );

        if valid_pixels == 0 {
            if self.strict {
                return Err(EvalError::DegenerateMask { frame: cur });
            }
            log::warn!(
                "pair {}->{}: no point rasterized into the current frame; it contributes 0 to TEPE",
                prev,
                cur
            );
        }

        Ok(WarpedPair {
            prev_frame: prev,
            frame: cur,
            mask,
            delta,
            valid_pixels,
        })
    }
}

/// A pool that failed to build degrades to sequential processing.
fn pool_or_sequential(
    built: Result<rayon::ThreadPool, rayon::ThreadPoolBuildError>,
) -> Option<rayon::ThreadPool> {
    match built {
        Ok(pool) => {
            log::debug!("Using {} worker threads", pool.current_num_threads());
            Some(pool)
        }
        Err(e) => {
            log::warn!("Parallel device unavailable ({e}); falling back to CPU");
            None
        }
    }
}
