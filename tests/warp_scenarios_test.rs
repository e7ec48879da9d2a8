//! Depth warping scenarios
//!
//! Checks the warper end to end on small synthetic frames:
//! - static scenes warp onto themselves
//! - pure translations leave uncovered columns masked
//! - flow that leaves the frame masks everything (TEPE 0, not undefined)

use approx::assert_relative_eq;
use tepe_rs::core::{DepthMap, FlowField, Intrinsics, IntrinsicsPolicy};
use tepe_rs::eval::{tepe, DepthWarper};
use tepe_rs::render::{CpuPointRasterizer, RasterSettings};

fn default_warper() -> DepthWarper {
    DepthWarper::default()
}

fn masked_columns(mask: &DepthMap) -> Vec<u32> {
    (0..mask.width())
        .filter(|&c| (0..mask.height()).all(|r| mask.get(r, c) == 0.0))
        .collect()
}

#[test]
fn test_static_constant_depth_4x4() {
    let depth = DepthMap::filled(4, 4, 5.0);
    let flow = FlowField::zeros(4, 4);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();

    assert!(out.mask.as_slice().iter().all(|&m| m == 1.0));
    for &d in out.delta.as_slice() {
        assert_relative_eq!(d, 0.0, epsilon = 1e-6);
    }

    // Ground truth and prediction identical → TEPE 0
    let metric = tepe(out.delta.as_slice(), out.delta.as_slice(), out.mask.as_slice()).unwrap();
    assert_eq!(metric, 0.0);
}

#[test]
fn test_static_varying_depth_non_square() {
    // 640×480-like aspect ratio, smooth depth ramp.
    let (w, h) = (16, 12);
    let depth = DepthMap::from_fn(w, h, |r, c| 1.0 + 0.05 * r as f32 + 0.02 * c as f32);
    let flow = FlowField::zeros(w, h);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();

    assert_eq!(out.valid_pixels(), (w * h) as usize);
    // Pixel (r, c) is reached by the points of (r, c), (r, c+1), (r+1, c)
    // and (r+1, c+1). On an increasing ramp its own point is the nearest.
    for &d in out.delta.as_slice() {
        assert_relative_eq!(d, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_static_scene_portrait_is_fully_valid() {
    // Taller than wide: the disk radius must follow the shorter side.
    let (w, h) = (4, 8);
    let depth = DepthMap::from_fn(w, h, |r, c| 2.0 + 0.1 * r as f32 + 0.05 * c as f32);
    let flow = FlowField::zeros(w, h);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();

    assert_eq!(out.valid_pixels(), (w * h) as usize);
    for &d in out.delta.as_slice() {
        assert_relative_eq!(d, 0.0, epsilon = 1e-6);
    }
    let metric = tepe(out.delta.as_slice(), out.delta.as_slice(), out.mask.as_slice()).unwrap();
    assert_eq!(metric, 0.0);
}

#[test]
fn test_translation_uncovers_leading_columns() {
    let depth = DepthMap::filled(8, 6, 3.0);
    let flow = FlowField::filled(8, 6, 2.0, 0.0);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();

    // Nothing lands within one pixel of column 0's center.
    assert_eq!(masked_columns(&out.mask), vec![0]);
    for r in 0..6 {
        for c in 1..8 {
            assert_eq!(out.mask.get(r, c), 1.0);
            assert_relative_eq!(out.delta.get(r, c), 0.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_flow_off_frame_masks_everything() {
    let (w, h) = (4, 4);
    let depth = DepthMap::filled(w, h, 5.0);
    let flow = FlowField::filled(w, h, 2.0 * w as f32, 0.0);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();
    assert_eq!(out.valid_pixels(), 0);

    let pred = DepthMap::filled(w, h, 123.0);
    let metric = tepe(out.delta.as_slice(), pred.as_slice(), out.mask.as_slice()).unwrap();
    assert_eq!(metric, 0.0);
}

#[test]
fn test_flow_of_exactly_width_touches_last_column_only() {
    // Column-0 points land on the right border, still within one disk
    // radius of the last column's centers.
    let (w, h) = (4, 4);
    let depth = DepthMap::filled(w, h, 5.0);
    let flow = FlowField::filled(w, h, w as f32, 0.0);

    let out = default_warper().delta_depth(&depth, &depth, &flow).unwrap();
    for r in 0..h {
        for c in 0..w {
            let expected = if c == w - 1 { 1.0 } else { 0.0 };
            assert_eq!(out.mask.get(r, c), expected, "pixel ({r}, {c})");
        }
    }
}

#[test]
fn test_source_pixel_leaving_frame_contributes_nowhere() {
    // Only the top-left pixel flows away; every other pixel stays.
    let (w, h) = (5, 5);
    let mut flow_data = vec![0.0f32; (w * h * 2) as usize];
    flow_data[0] = 50.0;
    flow_data[1] = 50.0;
    let flow = FlowField::from_vec(w, h, flow_data).unwrap();

    // The departing pixel is much closer than the rest; if it were
    // rasterized anywhere it would win the z-test there.
    let prev = DepthMap::from_fn(w, h, |r, c| if r == 0 && c == 0 { 0.5 } else { 4.0 });
    let cur = DepthMap::filled(w, h, 4.0);

    let out = default_warper().delta_depth(&cur, &prev, &flow).unwrap();
    for r in 0..h {
        for c in 0..w {
            if out.mask.get(r, c) > 0.0 {
                assert_relative_eq!(out.delta.get(r, c), 0.0, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn test_occlusion_keeps_nearest_surface() {
    // The right half moves left by two pixels over the left half. Where the
    // two overlap, the nearer (right half) depth must win.
    let (w, h) = (8, 4);
    let prev = DepthMap::from_fn(w, h, |_, c| if c >= 4 { 1.0 } else { 3.0 });
    let mut flow_data = Vec::with_capacity((w * h * 2) as usize);
    for _r in 0..h {
        for c in 0..w {
            flow_data.push(if c >= 4 { -2.0 } else { 0.0 });
            flow_data.push(0.0);
        }
    }
    let flow = FlowField::from_vec(w, h, flow_data).unwrap();
    let cur = DepthMap::filled(w, h, 3.0);

    let out = default_warper().delta_depth(&cur, &prev, &flow).unwrap();
    for r in 0..h {
        // Column 2 sits between corner points of both halves.
        assert_relative_eq!(out.delta.get(r, 2), 2.0, epsilon = 1e-6);
        // Column 0 is reached only by the far (left) half.
        assert_relative_eq!(out.delta.get(r, 0), 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_fixed_intrinsics_do_not_move_points() {
    // Back-projection and projection share the camera, so any intrinsics
    // reproduce the flow target exactly.
    let depth = DepthMap::from_fn(6, 6, |r, c| 2.0 + (r + c) as f32 * 0.1);
    let flow = FlowField::zeros(6, 6);

    let warper = DepthWarper::new(
        CpuPointRasterizer::new(),
        IntrinsicsPolicy::Fixed(Intrinsics::new(500.0, 480.0, 3.0, 3.0)),
        RasterSettings::default(),
    );
    let fixed = warper.delta_depth(&depth, &depth, &flow).unwrap();
    let default = default_warper().delta_depth(&depth, &depth, &flow).unwrap();

    assert_eq!(fixed.mask, default.mask);
    for (a, b) in fixed.delta.as_slice().iter().zip(default.delta.as_slice()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-5);
    }
}
