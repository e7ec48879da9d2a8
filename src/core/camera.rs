//! Pinhole camera model (intrinsics only).
//!
//! Cameras are used to:
//! - Back-project pixels with depth into 3D points
//! - Map projected points into the rasterizer's normalized device coordinates
//!
//! The evaluator never reads calibration: intrinsics are synthesized per frame
//! from the image size (see [`IntrinsicsPolicy`]).

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics in pixel units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Focal length in X (pixels)
    pub fx: f32,

    /// Focal length in Y (pixels)
    pub fy: f32,

    /// Principal point X (pixels)
    pub cx: f32,

    /// Principal point Y (pixels)
    pub cy: f32,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self { fx, fy, cx, cy }
    }
}

/// How intrinsics are chosen for a frame of a given size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntrinsicsPolicy {
    /// `fx = fy = W`, `cx = W/2`, `cy = H/2`.
    ///
    /// This is a synthetic field of view (roughly 53° horizontally), not a
    /// calibration. Reported TEPE numbers depend on it.
    #[default]
    ImageWidth,

    /// The same intrinsics for every frame regardless of size.
    Fixed(Intrinsics),
}

impl IntrinsicsPolicy {
    /// Resolve intrinsics for an image of `width × height` pixels.
    pub fn resolve(&self, width: u32, height: u32) -> Intrinsics {
        match *self {
            IntrinsicsPolicy::ImageWidth => {
                let w = width as f32;
                let h = height as f32;
                Intrinsics::new(w, w, w / 2.0, h / 2.0)
            }
            IntrinsicsPolicy::Fixed(k) => k,
        }
    }
}

/// A pinhole camera at the origin looking down +Z.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub intrinsics: Intrinsics,

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,
}

impl Camera {
    /// Create a new camera with given parameters.
    pub fn new(intrinsics: Intrinsics, width: u32, height: u32) -> Self {
        Self {
            intrinsics,
            width,
            height,
        }
    }

    /// Create a camera whose intrinsics follow `policy`.
    pub fn with_policy(policy: &IntrinsicsPolicy, width: u32, height: u32) -> Self {
        Self::new(policy.resolve(width, height), width, height)
    }

    /// Lift pixel `(u, v)` with depth `d` into camera space.
    ///
    /// `[x, y, z] = [d (u - cx)/fx, d (v - cy)/fy, d]`
    pub fn back_project(&self, u: f32, v: f32, depth: f32) -> Vector3<f32> {
        let k = &self.intrinsics;
        Vector3::new(depth * (u - k.cx) / k.fx, depth * (v - k.cy) / k.fy, depth)
    }

    /// NDC units per pixel divided by two: the shorter image side spans [-1, 1].
    pub fn ndc_scale(&self) -> f32 {
        self.width.min(self.height) as f32 / 2.0
    }

    /// Project a renderer-convention point (+X left, +Y up, +Z forward) into
    /// normalized device coordinates.
    ///
    /// The principal point is given in image convention (+X right, +Y down),
    /// so the screen-space projection is corrected by `-2 c` before the
    /// screen-to-NDC map `ndc = (s + size/2) / scale`. The result lines up
    /// with the pixel centers of [`pixel_center_ndc`].
    ///
    /// Returns None for points behind the camera or non-finite projections.
    pub fn to_ndc(&self, point: &Vector3<f32>) -> Option<Vector2<f32>> {
        if point.z < 0.0 {
            return None;
        }

        let k = &self.intrinsics;
        let scale = self.ndc_scale();
        let screen_x = k.fx * point.x / point.z + k.cx - 2.0 * k.cx;
        let screen_y = k.fy * point.y / point.z + k.cy - 2.0 * k.cy;
        let x = (screen_x + self.width as f32 / 2.0) / scale;
        let y = (screen_y + self.height as f32 / 2.0) / scale;

        if x.is_finite() && y.is_finite() {
            Some(Vector2::new(x, y))
        } else {
            None
        }
    }
}

/// NDC extent of one image side, given the other side.
///
/// The shorter side spans [-1, 1]; the longer one is stretched so pixels stay square.
pub fn ndc_range(size: u32, other: u32) -> f32 {
    if size > other {
        2.0 * size as f32 / other as f32
    } else {
        2.0
    }
}

/// NDC coordinate of the center of pixel index `i` along a side of `size`
/// pixels, counted in the renderer's flipped direction.
pub fn pixel_center_ndc(i: u32, size: u32, other: u32) -> f32 {
    let range = ndc_range(size, other);
    let offset = range / 2.0;
    -offset + (range * i as f32 + offset) / size as f32
}

/// Continuous (flipped) pixel index whose center sits at NDC coordinate `ndc`.
///
/// Inverse of [`pixel_center_ndc`]; used to bound the pixels a disk can touch.
pub fn ndc_to_pixel(ndc: f32, size: u32, other: u32) -> f32 {
    let range = ndc_range(size, other);
    let offset = range / 2.0;
    ((ndc + offset) * size as f32 - offset) / range
}
