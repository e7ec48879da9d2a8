//! Point-cloud rendering (CPU implementation).
//!
//! This module implements the rasterization the depth warper relies on:
//! - Project points to NDC
//! - Keep the nearest point per pixel inside a fixed disk radius
//! - Composite a scalar feature with inverse-squared-distance weights
//!
//! The warper only sees the [`Rasterizer`] trait; [`CpuPointRasterizer`] is
//! the implementation shipped here.

pub mod points;

// Re-export
pub use points::{
    composite, CompositeParams, CpuPointRasterizer, Fragments, PointCloud, RasterOutput,
    RasterSettings, Rasterizer,
};
