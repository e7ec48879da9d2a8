//! Temporal End-Point Error.
//!
//! ```text
//! TEPE = Σ |Δgt − Δpred| · mask / N
//! ```
//!
//! `N` is the total element count of the concatenated sequence, masked-out
//! pixels included. This is not a mean over valid pixels: a frame pair with
//! half its pixels masked contributes half as much. The valid-pixel mean is
//! reported separately as `masked_mean` for diagnostics only.

use super::sequence::WarpedSequence;
use super::EvalError;
use serde::{Deserialize, Serialize};

/// TEPE over flat, aligned buffers.
///
/// All three slices must have the same length. Sums are accumulated in `f64`.
pub fn tepe(gt_delta: &[f32], pred_delta: &[f32], mask: &[f32]) -> Result<f64, EvalError> {
    if gt_delta.len() != pred_delta.len() || gt_delta.len() != mask.len() {
        return Err(EvalError::LengthMismatch {
            gt: gt_delta.len(),
            pred: pred_delta.len(),
            mask: mask.len(),
        });
    }
    if gt_delta.is_empty() {
        return Err(EvalError::EmptySequence);
    }

    Ok(masked_abs_sum(gt_delta, pred_delta, mask) / gt_delta.len() as f64)
}

fn masked_abs_sum(gt_delta: &[f32], pred_delta: &[f32], mask: &[f32]) -> f64 {
    gt_delta
        .iter()
        .zip(pred_delta)
        .zip(mask)
        .map(|((&g, &p), &m)| {
            // Masked pixels may hold garbage (NaN depth); never let it leak.
            if m == 0.0 {
                0.0
            } else {
                (g as f64 - p as f64).abs() * m as f64
            }
        })
        .sum()
}

/// Per-pair breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub prev_frame: usize,
    pub frame: usize,

    /// Σ |Δgt − Δpred| · mask / pixels of this pair
    pub tepe: f64,

    pub valid_pixels: usize,
    pub total_pixels: usize,
    pub valid_fraction: f64,

    /// The validity mask was empty
    pub degenerate: bool,
}

/// Full evaluation result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TepeReport {
    /// The metric
    pub tepe: f64,

    /// Σ |Δgt − Δpred| · mask / valid pixels (diagnostic)
    pub masked_mean: Option<f64>,

    pub total_pixels: usize,
    pub valid_pixels: usize,
    pub degenerate_pairs: usize,
    pub pairs: Vec<PairReport>,
}

/// Compare ground-truth and predicted warps.
///
/// The validity mask comes from the ground-truth warp. Both sequences must
/// cover the same frame pairs at the same resolution.
pub fn evaluate(gt: &WarpedSequence, pred: &WarpedSequence) -> Result<TepeReport, EvalError> {
    if gt.len() != pred.len() {
        return Err(EvalError::PairCountMismatch {
            gt: gt.len(),
            pred: pred.len(),
        });
    }
    if gt.is_empty() {
        return Err(EvalError::EmptySequence);
    }

    let mut pairs = Vec::with_capacity(gt.len());
    let mut sum = 0.0f64;
    let mut total_pixels = 0usize;
    let mut valid_pixels = 0usize;

    for (g, p) in gt.pairs.iter().zip(&pred.pairs) {
        if g.frame != p.frame || g.prev_frame != p.prev_frame {
            return Err(EvalError::FrameOrder {
                gt: g.frame,
                pred: p.frame,
            });
        }
        if g.delta.shape() != p.delta.shape() {
            return Err(EvalError::ResolutionMismatch {
                frame: g.frame,
                gt: g.delta.shape(),
                pred: p.delta.shape(),
            });
        }

        let pair_sum = masked_abs_sum(g.delta.as_slice(), p.delta.as_slice(), g.mask.as_slice());
        let n = g.total_pixels();
        sum += pair_sum;
        total_pixels += n;
        valid_pixels += g.valid_pixels;

        pairs.push(PairReport {
            prev_frame: g.prev_frame,
            frame: g.frame,
            tepe: pair_sum / n.max(1) as f64,
            valid_pixels: g.valid_pixels,
            total_pixels: n,
            valid_fraction: g.valid_pixels as f64 / n.max(1) as f64,
            degenerate: g.is_degenerate(),
        });
    }

    if total_pixels == 0 {
        return Err(EvalError::EmptySequence);
    }

    Ok(TepeReport {
        tepe: sum / total_pixels as f64,
        masked_mean: (valid_pixels > 0).then(|| sum / valid_pixels as f64),
        total_pixels,
        valid_pixels,
        degenerate_pairs: pairs.iter().filter(|p| p.degenerate).count(),
        pairs,
    })
}
