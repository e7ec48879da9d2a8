//! # tepe-rs: Temporal End-Point Error for video depth
//!
//! TEPE measures how well a video depth predictor reproduces the
//! frame-to-frame *change* of depth. For each adjacent frame pair the previous
//! depth is lifted to a point cloud, moved along the optical flow, rasterized
//! into the current view and subtracted from the current depth. TEPE is the
//! masked L1 difference between the ground-truth and predicted results.
//!
//! ## Architecture
//!
//! - `core`: Fundamental data structures (camera, depth maps, flow fields)
//! - `render`: Point-cloud rasterizer (CPU) behind the `Rasterizer` trait
//! - `eval`: Depth warper, sequence driver and the metric
//! - `io`: `.npy` codec, dataset layout, reports
//! - `config`: JSON-backed evaluation settings

// Core data structures
pub mod core;

// Point rasterization
pub mod render;

// Warping, sequences, metric
pub mod eval;

// I/O operations (.npy, dataset layout, reports)
pub mod io;

pub mod config;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigError, EvalConfig};
pub use crate::core::{Camera, DepthMap, FlowField, Intrinsics, IntrinsicsPolicy};
pub use eval::{DepthWarper, Device, EvalError, FrameRange, TepeReport};
pub use io::{DatasetError, NpyError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
