//! tepe-eval: Temporal End-Point Error of predicted depth against ground truth
//!
//! Usage:
//!   tepe-eval --dataset data/office/Easy/P000 --results results/office
//!   tepe-eval --config eval.json --threads 8 --report tepe.json

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tepe_rs::eval::{self, Device};
use tepe_rs::io::{dump_sequences, save_report_json};
use tepe_rs::EvalConfig;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Temporal End-Point Error (TEPE) of a predicted depth sequence"
)]
struct Args {
    /// JSON config; flags below override its fields
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ground-truth dataset directory (contains depth/ and flow/)
    #[arg(long, value_name = "DIR")]
    dataset: Option<PathBuf>,

    /// Directory of predicted depth .npy files
    #[arg(long, value_name = "DIR")]
    results: Option<PathBuf>,

    /// First frame of the first pair
    #[arg(long)]
    start: Option<usize>,

    /// Number of adjacent frame pairs
    #[arg(long)]
    pairs: Option<usize>,

    /// Multiplier applied to predictions
    #[arg(long, value_name = "FACTOR")]
    pred_scale: Option<f32>,

    /// Channel kept from batched predictions
    #[arg(long, value_name = "INDEX")]
    pred_channel: Option<usize>,

    /// Process frame pairs on N worker threads (0 = all cores)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Fail when a frame pair has an empty validity mask
    #[arg(long)]
    strict: bool,

    /// Write the full per-pair report as JSON
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Dump masks and delta depths as .npy files
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<(EvalConfig, Option<PathBuf>, Option<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_json_file(path)?,
            None => EvalConfig::default(),
        };

        if let Some(dir) = self.dataset {
            config.dataset_root = dir;
        }
        if let Some(dir) = self.results {
            config.results_root = dir;
        }
        if let Some(start) = self.start {
            config.start_frame = start;
        }
        if let Some(pairs) = self.pairs {
            config.num_pairs = pairs;
        }
        if let Some(scale) = self.pred_scale {
            config.prediction_scale = scale;
        }
        if let Some(channel) = self.pred_channel {
            config.prediction_channel = channel;
        }
        if let Some(threads) = self.threads {
            config.device = Device::Parallel { threads };
        }
        config.strict |= self.strict;
        config.validate()?;

        Ok((config, self.report, self.dump_dir))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, report_path, dump_dir) = Args::parse().into_config()?;
    log::info!("tepe-eval v{}", tepe_rs::VERSION);
    log::info!(
        "Dataset: {}, results: {}",
        config.dataset_root.display(),
        config.results_root.display()
    );

    let evaluation = eval::run(&config).context("evaluation failed")?;

    if let Some(path) = &report_path {
        save_report_json(&evaluation.report, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        log::info!("Report saved to {}", path.display());
    }

    if let Some(dir) = &dump_dir {
        dump_sequences(dir, &evaluation.ground_truth, &evaluation.prediction)
            .with_context(|| format!("failed to dump arrays to {}", dir.display()))?;
    }

    println!("TEPE: {:.6}", evaluation.report.tepe);
    Ok(())
}
