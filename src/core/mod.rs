//! Core data structures.
//!
//! This module contains the fundamental types used throughout the system:
//! - `Camera`: pinhole intrinsics and NDC mapping
//! - `DepthMap`: dense H×W maps (depth, masks, delta depth)
//! - `FlowField`: dense H×W×2 optical flow
//!
//! All types here are "pure data" - no I/O, no rendering logic.

mod camera;
mod depth;
mod flow;

// Re-export public types
pub use camera::{
    ndc_range, ndc_to_pixel, pixel_center_ndc, Camera, Intrinsics, IntrinsicsPolicy,
};
pub use depth::{DepthMap, ShapeError};
pub use flow::FlowField;
