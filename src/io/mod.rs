//! I/O operations for loading and saving data.
//!
//! This module handles all file format parsing and export:
//! - NumPy `.npy` arrays (depth, flow, predictions, dumps)
//! - Dataset / results directory layout
//! - JSON reports

pub mod dataset;
pub mod npy;
pub mod report;

// Re-export public types and functions
pub use dataset::{
    DatasetError, DatasetLayout, DepthSource, FlowSource, GroundTruthDepth, PredictedDepth,
};
pub use npy::{read_npy, read_npy_from, write_npy, write_npy_to, NpyArray, NpyError};
pub use report::{dump_sequences, load_report_json, save_report_json, ReportError};
