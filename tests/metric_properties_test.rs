//! TEPE aggregation properties
//!
//! - non-negative
//! - zero when deltas agree wherever the mask is set
//! - normalized by the total element count, not the valid count
//! - invariant to any consistent reordering of frames or pixels

use approx::assert_relative_eq;
use tepe_rs::core::{DepthMap, FlowField};
use tepe_rs::eval::{evaluate, tepe, DepthWarper, WarpedPair, WarpedSequence};

/// Small deterministic pseudo-random sequence (LCG), no extra dependency.
fn lcg_values(seed: u64, n: usize, scale: f32) -> Vec<f32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 40) as f32 / (1u64 << 24) as f32 - 0.5) * scale
        })
        .collect()
}

fn binary_mask(seed: u64, n: usize) -> Vec<f32> {
    lcg_values(seed, n, 2.0)
        .into_iter()
        .map(|v| if v > 0.0 { 1.0 } else { 0.0 })
        .collect()
}

#[test]
fn test_non_negative() {
    let n = 500;
    let gt = lcg_values(1, n, 4.0);
    let pred = lcg_values(2, n, 4.0);
    let mask = binary_mask(3, n);
    assert!(tepe(&gt, &pred, &mask).unwrap() >= 0.0);
}

#[test]
fn test_zero_when_equal_under_mask() {
    let n = 300;
    let gt = lcg_values(4, n, 1.0);
    let mask = binary_mask(5, n);
    // Disagree only where the mask is off.
    let pred: Vec<f32> = gt
        .iter()
        .zip(&mask)
        .map(|(&g, &m)| if m > 0.0 { g } else { g + 100.0 })
        .collect();
    assert_eq!(tepe(&gt, &pred, &mask).unwrap(), 0.0);
}

#[test]
fn test_permutation_invariance() {
    let n = 257;
    let gt = lcg_values(6, n, 2.0);
    let pred = lcg_values(7, n, 2.0);
    let mask = binary_mask(8, n);

    // Stride permutation (257 is prime, so stride 31 visits every index once).
    let perm: Vec<usize> = (0..n).map(|i| (i * 31) % n).collect();
    let permute = |v: &[f32]| perm.iter().map(|&i| v[i]).collect::<Vec<_>>();

    let a = tepe(&gt, &pred, &mask).unwrap();
    let b = tepe(&permute(&gt), &permute(&pred), &permute(&mask)).unwrap();
    assert_relative_eq!(a, b, epsilon = 1e-12);
}

#[test]
fn test_normalized_by_total_count_across_frames() {
    // Two frames of four pixels; only one pixel valid in each.
    let gt = [2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0];
    let pred = [0.0; 8];
    let mask = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    assert_relative_eq!(tepe(&gt, &pred, &mask).unwrap(), 3.0 / 8.0);
}

fn pair(frame: usize, delta: Vec<f32>, mask: Vec<f32>) -> WarpedPair {
    let mask = DepthMap::from_vec(2, 2, mask).unwrap();
    WarpedPair {
        prev_frame: frame - 1,
        frame,
        valid_pixels: mask.count_positive(),
        delta: DepthMap::from_vec(2, 2, delta).unwrap(),
        mask,
    }
}

#[test]
fn test_report_uses_ground_truth_mask() {
    let gt = WarpedSequence {
        label: "gt".into(),
        pairs: vec![
            pair(1, vec![1.0, 1.0, 1.0, 1.0], vec![1.0, 1.0, 0.0, 0.0]),
            pair(2, vec![0.5, 0.5, 0.5, 0.5], vec![1.0, 1.0, 1.0, 1.0]),
        ],
    };
    // The prediction's own mask is ignored.
    let pred = WarpedSequence {
        label: "pred".into(),
        pairs: vec![
            pair(1, vec![0.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 0.0]),
            pair(2, vec![0.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 0.0]),
        ],
    };

    let report = evaluate(&gt, &pred).unwrap();
    // Frame 1: 2 × 1.0, frame 2: 4 × 0.5, over 8 elements.
    assert_relative_eq!(report.tepe, 4.0 / 8.0);
    assert_relative_eq!(report.pairs[0].tepe, 0.5);
    assert_relative_eq!(report.pairs[1].tepe, 0.5);
    assert_eq!(report.valid_pixels, 6);
    assert_relative_eq!(report.masked_mean.unwrap(), 4.0 / 6.0);

    // Flat TEPE over the concatenated sequences agrees.
    let flat = tepe(&gt.concat_deltas(), &pred.concat_deltas(), &gt.concat_masks()).unwrap();
    assert_relative_eq!(flat, report.tepe);
}

#[test]
fn test_report_rejects_misaligned_sequences() {
    let a = WarpedSequence {
        label: "gt".into(),
        pairs: vec![pair(1, vec![0.0; 4], vec![1.0; 4])],
    };
    let b = WarpedSequence {
        label: "pred".into(),
        pairs: vec![pair(2, vec![0.0; 4], vec![1.0; 4])],
    };
    assert!(evaluate(&a, &b).is_err());
    assert!(evaluate(&a, &WarpedSequence::default()).is_err());
}

#[test]
fn test_identical_sources_score_zero() {
    let warper: DepthWarper = DepthWarper::default();
    let prev = DepthMap::from_fn(6, 4, |r, c| 1.0 + 0.1 * (r + c) as f32);
    let cur = DepthMap::from_fn(6, 4, |r, c| 1.2 + 0.1 * (r * c) as f32);
    let flow = FlowField::filled(6, 4, 0.3, 0.6);

    let out = warper.delta_depth(&cur, &prev, &flow).unwrap();
    let metric = tepe(out.delta.as_slice(), out.delta.as_slice(), out.mask.as_slice()).unwrap();
    assert_eq!(metric, 0.0);
}
