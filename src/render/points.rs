//! Point-cloud rasterizer: disks in NDC, one nearest point per pixel, and a
//! weighted feature compositor.
//!
//! Conventions follow the usual differentiable-renderer layout:
//! - Points live in camera space with +X left, +Y up, +Z forward. Callers
//!   holding image-convention points (+X right, +Y down) negate x and y.
//! - Output pixel `(row, col)` is rasterized at NDC
//!   `(pixel_center_ndc(W-1-col, W, H), pixel_center_ndc(H-1-row, H, W))`.
//! - A point covers a pixel when its squared NDC distance is `< radius²`.
//! - Among covering points the smallest `z` is kept; ties keep the lower index.

use crate::core::{ndc_to_pixel, pixel_center_ndc, Camera};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Points in renderer convention, each with one scalar feature.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    pub points: Vec<Vector3<f32>>,
    pub features: Vec<f32>,
}

impl PointCloud {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
            features: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, point: Vector3<f32>, feature: f32) {
        self.points.push(point);
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Blending constants for [`composite`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Feature value for pixels no point reaches.
    pub background: f32,

    /// Added to the normalized squared distance before inverting it.
    pub gamma: f32,

    /// Weight given to the background in the normalization.
    pub epsilon: f32,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            background: 0.0,
            gamma: 1e-4,
            epsilon: 1e-5,
        }
    }
}

/// Rasterization settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Disk radius in NDC units. `None` means one pixel, `2 / min(H, W)`.
    pub radius_ndc: Option<f32>,

    /// Points kept per pixel. Only the nearest point is supported.
    pub points_per_pixel: usize,

    pub composite: CompositeParams,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            radius_ndc: None,
            points_per_pixel: 1,
            composite: CompositeParams::default(),
        }
    }
}

impl RasterSettings {
    /// Radius for a `width × height` image.
    ///
    /// The shorter side spans [-1, 1] in NDC, so `2 / min(H, W)` is one pixel
    /// for both landscape and portrait frames.
    pub fn radius_for(&self, width: u32, height: u32) -> f32 {
        self.radius_ndc.unwrap_or(2.0 / width.min(height) as f32)
    }
}

/// Per-pixel fragment buffers for the single kept layer.
///
/// Empty pixels hold `-1` in all three buffers.
#[derive(Clone, Debug)]
pub struct Fragments {
    pub width: u32,
    pub height: u32,

    /// Index of the nearest covering point
    pub idx: Vec<i64>,

    /// Depth of that point
    pub zbuf: Vec<f32>,

    /// Squared NDC distance from the pixel center to the point
    pub dists: Vec<f32>,
}

impl Fragments {
    pub fn empty(width: u32, height: u32) -> Self {
        let n = (width * height) as usize;
        Self {
            width,
            height,
            idx: vec![-1; n],
            zbuf: vec![-1.0; n],
            dists: vec![-1.0; n],
        }
    }

    pub fn covered(&self, pixel: usize) -> bool {
        self.idx[pixel] >= 0
    }
}

/// Everything a rasterize call produces.
#[derive(Clone, Debug)]
pub struct RasterOutput {
    pub fragments: Fragments,

    /// Composited feature per pixel
    pub features: Vec<f32>,

    /// Depth of the nearest point per pixel, clamped to `>= 0`
    pub zbuf: Vec<f32>,
}

/// The rendering capability the depth warper depends on.
///
/// Implementations must reproduce the semantics documented at module level;
/// TEPE values depend on exactly which pixels each point covers.
pub trait Rasterizer: Sync {
    fn rasterize(
        &self,
        cloud: &PointCloud,
        camera: &Camera,
        settings: &RasterSettings,
    ) -> RasterOutput;
}

/// CPU rasterizer.
///
/// Instead of testing every point against every pixel, each point is
/// scattered into the window of pixels its disk can overlap. Visiting points
/// in index order and replacing only on strictly smaller `z` yields the same
/// buffers as the per-pixel gather.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuPointRasterizer;

impl CpuPointRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize only (no compositing).
    pub fn rasterize_fragments(
        &self,
        cloud: &PointCloud,
        camera: &Camera,
        radius: f32,
    ) -> Fragments {
        let (width, height) = (camera.width, camera.height);
        let mut frags = Fragments::empty(width, height);
        if width == 0 || height == 0 {
            return frags;
        }

        let radius2 = radius * radius;
        let mut skipped = 0usize;

        for (p, point) in cloud.points.iter().enumerate() {
            let Some(ndc) = camera.to_ndc(point) else {
                skipped += 1;
                continue;
            };
            let z = point.z;

            // Flipped pixel indices (xi = W-1-col, yi = H-1-row) the disk can reach.
            let Some((xi_lo, xi_hi)) = pixel_window(ndc.x, radius, width, height) else {
                continue;
            };
            let Some((yi_lo, yi_hi)) = pixel_window(ndc.y, radius, height, width) else {
                continue;
            };

            for yi in yi_lo..=yi_hi {
                let yf = pixel_center_ndc(yi, height, width);
                let dy = yf - ndc.y;
                let row = height - 1 - yi;

                for xi in xi_lo..=xi_hi {
                    let xf = pixel_center_ndc(xi, width, height);
                    let dx = xf - ndc.x;
                    let dist2 = dx * dx + dy * dy;
                    if !(dist2 < radius2) {
                        continue;
                    }

                    let col = width - 1 - xi;
                    let pix = (row * width + col) as usize;
                    if frags.idx[pix] < 0 || z < frags.zbuf[pix] {
                        frags.idx[pix] = p as i64;
                        frags.zbuf[pix] = z;
                        frags.dists[pix] = dist2;
                    }
                }
            }
        }

        if skipped > 0 {
            log::trace!(
                "rasterizer skipped {} of {} points (behind camera or non-finite)",
                skipped,
                cloud.len()
            );
        }

        frags
    }
}

impl Rasterizer for CpuPointRasterizer {
    fn rasterize(
        &self,
        cloud: &PointCloud,
        camera: &Camera,
        settings: &RasterSettings,
    ) -> RasterOutput {
        if settings.points_per_pixel != 1 {
            log::warn!(
                "points_per_pixel = {} requested; CPU rasterizer keeps only the nearest point",
                settings.points_per_pixel
            );
        }

        let radius = settings.radius_for(camera.width, camera.height);
        let fragments = self.rasterize_fragments(cloud, camera, radius);
        let features = composite(&fragments, &cloud.features, radius, &settings.composite);
        let zbuf = fragments.zbuf.iter().map(|&z| z.max(0.0)).collect();

        RasterOutput {
            fragments,
            features,
            zbuf,
        }
    }
}

/// Inclusive range of flipped pixel indices within `radius` of `ndc` along
/// one image side, or None if the disk misses the side entirely.
fn pixel_window(ndc: f32, radius: f32, size: u32, other: u32) -> Option<(u32, u32)> {
    let lo = ndc_to_pixel(ndc - radius, size, other).floor();
    let hi = ndc_to_pixel(ndc + radius, size, other).ceil();
    if !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo > (size - 1) as f32 {
        return None;
    }
    let lo = lo.max(0.0) as u32;
    let hi = hi.min((size - 1) as f32) as u32;
    Some((lo, hi))
}

/// Blend point features into pixels with inverse-squared-distance weights.
///
/// For the covering point at normalized squared distance `d² / r²`:
///
/// ```text
/// w = 1 / (d² / r² + gamma)
/// feature = (w · f + eps · bg) / (w + eps)
/// ```
///
/// Pixels no point covers take the background value.
pub fn composite(
    fragments: &Fragments,
    features: &[f32],
    radius: f32,
    params: &CompositeParams,
) -> Vec<f32> {
    let radius2 = radius * radius;
    fragments
        .idx
        .iter()
        .zip(&fragments.dists)
        .map(|(&idx, &dist2)| {
            if idx < 0 {
                return params.background;
            }
            let w = 1.0 / (dist2 / radius2 + params.gamma);
            let f = features[idx as usize];
            (w * f + params.epsilon * params.background) / (w + params.epsilon)
        })
        .collect()
}
