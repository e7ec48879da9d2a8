//! Result export: JSON report and per-pair `.npy` dumps.

use crate::eval::{TepeReport, WarpedSequence};
use crate::io::npy::{write_npy, NpyError};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Npy(#[from] NpyError),
}

/// Write `report` as pretty-printed JSON.
pub fn save_report_json(report: &TepeReport, path: &Path) -> Result<(), ReportError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

pub fn load_report_json(path: &Path) -> Result<TepeReport, ReportError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Dump masks and delta depths of both sequences into `dir`:
///
/// ```text
/// {frame:06}_mask.npy          ground-truth validity mask
/// {frame:06}_gt_delta.npy
/// {frame:06}_pred_delta.npy
/// ```
///
/// Returns the written paths.
pub fn dump_sequences(
    dir: &Path,
    ground_truth: &WarpedSequence,
    prediction: &WarpedSequence,
) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for gt in &ground_truth.pairs {
        let shape = [gt.mask.height() as usize, gt.mask.width() as usize];

        let path = dir.join(format!("{:06}_mask.npy", gt.frame));
        write_npy(&path, &shape, gt.mask.as_slice())?;
        written.push(path);

        let path = dir.join(format!("{:06}_gt_delta.npy", gt.frame));
        write_npy(&path, &shape, gt.delta.as_slice())?;
        written.push(path);
    }

    for pred in &prediction.pairs {
        let shape = [pred.delta.height() as usize, pred.delta.width() as usize];
        let path = dir.join(format!("{:06}_pred_delta.npy", pred.frame));
        write_npy(&path, &shape, pred.delta.as_slice())?;
        written.push(path);
    }

    log::info!("Wrote {} arrays to {}", written.len(), dir.display());
    Ok(written)
}
