//! Depth warping: carry the previous frame's depth into the current view
//! along the optical flow and compare it with the observed depth.

use crate::core::{Camera, DepthMap, FlowField, IntrinsicsPolicy};
use crate::render::{CpuPointRasterizer, PointCloud, RasterSettings, Rasterizer};
use nalgebra::Vector3;
use thiserror::Error;

/// Inputs of one frame pair disagree on spatial size.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{what} is {}×{}, expected {}×{}", .actual.0, .actual.1, .expected.0, .expected.1)]
pub struct ShapeMismatch {
    pub what: &'static str,

    /// (height, width) of the current depth map
    pub expected: (u32, u32),

    /// (height, width) of the offending input
    pub actual: (u32, u32),
}

/// Output of [`DepthWarper::delta_depth`], both H×W.
#[derive(Clone, Debug)]
pub struct WarpResult {
    /// 1.0 where some previous-frame point was rasterized, else 0.0
    pub mask: DepthMap,

    /// Current depth minus warped previous depth. Meaningful only under `mask`.
    pub delta: DepthMap,
}

impl WarpResult {
    pub fn valid_pixels(&self) -> usize {
        self.mask.count_positive()
    }
}

/// Warps depth between adjacent frames through a point rasterizer.
#[derive(Clone, Debug)]
pub struct DepthWarper<R = CpuPointRasterizer> {
    rasterizer: R,
    intrinsics: IntrinsicsPolicy,
    settings: RasterSettings,
}

impl Default for DepthWarper<CpuPointRasterizer> {
    /// CPU rasterizer, image-width intrinsics, default raster settings.
    fn default() -> Self {
        Self::new(
            CpuPointRasterizer::new(),
            IntrinsicsPolicy::default(),
            RasterSettings::default(),
        )
    }
}

impl<R: Rasterizer> DepthWarper<R> {
    pub fn new(rasterizer: R, intrinsics: IntrinsicsPolicy, settings: RasterSettings) -> Self {
        Self {
            rasterizer,
            intrinsics,
            settings,
        }
    }

    /// Compute the validity mask and delta depth for one frame pair.
    ///
    /// 1. Displace the previous frame's pixel grid by `flow`.
    /// 2. Back-project the *displaced* coordinates with `depth_prev`.
    /// 3. Flip x/y into renderer convention, rasterize with the same camera.
    /// 4. `mask = composited feature > 0`, `delta = depth - max(zbuf, 0)`.
    pub fn delta_depth(
        &self,
        depth: &DepthMap,
        depth_prev: &DepthMap,
        flow: &FlowField,
    ) -> Result<WarpResult, ShapeMismatch> {
        let expected = depth.shape();
        if depth_prev.shape() != expected {
            return Err(ShapeMismatch {
                what: "previous depth",
                expected,
                actual: depth_prev.shape(),
            });
        }
        if flow.shape() != expected {
            return Err(ShapeMismatch {
                what: "optical flow",
                expected,
                actual: flow.shape(),
            });
        }

        let (width, height) = (depth.width(), depth.height());
        let camera = Camera::with_policy(&self.intrinsics, width, height);
        let cloud = flow_point_cloud(depth_prev, flow, &camera);
        let raster = self.rasterizer.rasterize(&cloud, &camera, &self.settings);

        let mask: Vec<f32> = raster
            .features
            .iter()
            .map(|&f| if f > 0.0 { 1.0 } else { 0.0 })
            .collect();
        let delta: Vec<f32> = depth
            .as_slice()
            .iter()
            .zip(&raster.zbuf)
            .map(|(&d, &z)| d - z)
            .collect();

        Ok(WarpResult {
            mask: DepthMap::from_vec(width, height, mask).map_err(|_| ShapeMismatch {
                what: "rasterized mask",
                expected,
                actual: (raster.fragments.height, raster.fragments.width),
            })?,
            delta: DepthMap::from_vec(width, height, delta).map_err(|_| ShapeMismatch {
                what: "rasterized z-buffer",
                expected,
                actual: (raster.fragments.height, raster.fragments.width),
            })?,
        })
    }
}

/// One renderer-convention point per previous-frame pixel, feature 1.0.
///
/// Pixel `(i, j)` moves to `(u, v) = (j + du, i + dv)` and is lifted with the
/// previous depth at `(i, j)`. Lifting the displaced coordinates places the
/// point where the current camera sees the flow target.
pub fn flow_point_cloud(depth_prev: &DepthMap, flow: &FlowField, camera: &Camera) -> PointCloud {
    let (width, height) = (depth_prev.width(), depth_prev.height());
    let mut cloud = PointCloud::with_capacity((width * height) as usize);

    for i in 0..height {
        for j in 0..width {
            let f = flow.get(i, j);
            let u = j as f32 + f.x;
            let v = i as f32 + f.y;
            let p = camera.back_project(u, v, depth_prev.get(i, j));
            cloud.push(Vector3::new(-p.x, -p.y, p.z), 1.0);
        }
    }

    cloud
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn warper() -> DepthWarper {
        DepthWarper::default()
    }

    #[test]
    fn test_point_cloud_uses_displaced_coordinates() {
        let camera = Camera::with_policy(&IntrinsicsPolicy::ImageWidth, 4, 4);
        let depth = DepthMap::filled(4, 4, 2.0);
        let flow = FlowField::filled(4, 4, 1.0, 0.5);
        let cloud = flow_point_cloud(&depth, &flow, &camera);

        assert_eq!(cloud.len(), 16);
        assert!(cloud.features.iter().all(|&f| f == 1.0));

        // Pixel (0, 0) → (u, v) = (1, 0.5); fx = fy = 4, cx = cy = 2.
        let p = cloud.points[0];
        assert_relative_eq!(p.x, -(2.0 * (1.0 - 2.0) / 4.0));
        assert_relative_eq!(p.y, -(2.0 * (0.5 - 2.0) / 4.0));
        assert_relative_eq!(p.z, 2.0);
    }

    #[test]
    fn test_static_scene_has_zero_delta() {
        let depth = DepthMap::filled(4, 4, 5.0);
        let flow = FlowField::zeros(4, 4);
        let out = warper().delta_depth(&depth, &depth, &flow).unwrap();

        assert_eq!(out.valid_pixels(), 16);
        for &d in out.delta.as_slice() {
            assert_relative_eq!(d, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_depth_change_shows_in_delta() {
        let prev = DepthMap::filled(6, 6, 3.0);
        let cur = DepthMap::filled(6, 6, 3.5);
        let out = warper()
            .delta_depth(&cur, &prev, &FlowField::zeros(6, 6))
            .unwrap();

        for (m, d) in out.mask.as_slice().iter().zip(out.delta.as_slice()) {
            assert_eq!(*m, 1.0);
            assert_relative_eq!(*d, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_unmasked_pixels_hold_current_depth() {
        // Everything flows far off-frame: zbuf clamps to 0, delta == depth.
        let depth = DepthMap::filled(4, 4, 2.0);
        let flow = FlowField::filled(4, 4, 40.0, 0.0);
        let out = warper().delta_depth(&depth, &depth, &flow).unwrap();

        assert_eq!(out.valid_pixels(), 0);
        assert!(out.delta.as_slice().iter().all(|&d| d == 2.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let depth = DepthMap::filled(4, 4, 1.0);
        let prev = DepthMap::filled(4, 3, 1.0);
        let err = warper()
            .delta_depth(&depth, &prev, &FlowField::zeros(4, 4))
            .unwrap_err();
        assert_eq!(err.what, "previous depth");
        assert_eq!(err.actual, (3, 4));

        let err = warper()
            .delta_depth(&depth, &depth, &FlowField::zeros(5, 4))
            .unwrap_err();
        assert_eq!(err.what, "optical flow");
    }
}
