//! Regression against a real TartanAir sequence.
//!
//! Needs the dataset and a matching set of predictions on disk:
//!
//! ```text
//! TEPE_TARTANAIR_DIR=/data/tartanair/office/Easy/P000 \
//! TEPE_RESULTS_DIR=/data/results/office \
//! cargo test --test tartanair_regression_test -- --ignored --nocapture
//! ```
//!
//! The first 29 pairs of that sequence score about 0.0077.

use std::path::PathBuf;
use tepe_rs::eval::{self, Device};
use tepe_rs::EvalConfig;

const EXPECTED_TEPE: f64 = 0.0077;

fn env_dir(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from).filter(|p| p.is_dir())
}

#[test]
#[ignore]
fn test_tartanair_office_first_29_pairs() {
    let (Some(dataset), Some(results)) = (
        env_dir("TEPE_TARTANAIR_DIR"),
        env_dir("TEPE_RESULTS_DIR"),
    ) else {
        eprintln!("TEPE_TARTANAIR_DIR / TEPE_RESULTS_DIR not set, skipping");
        return;
    };

    let config = EvalConfig {
        dataset_root: dataset,
        results_root: results,
        device: Device::Parallel { threads: 0 },
        ..EvalConfig::default()
    };
    config.validate().unwrap();

    let evaluation = eval::run(&config).unwrap();
    let report = &evaluation.report;
    println!("TEPE: {:.6}", report.tepe);
    for pair in &report.pairs {
        println!(
            "  {:>3} -> {:>3}: {:.6} ({:.1}% valid)",
            pair.prev_frame,
            pair.frame,
            pair.tepe,
            pair.valid_fraction * 100.0
        );
    }

    assert_eq!(report.pairs.len(), 29);
    assert_eq!(report.degenerate_pairs, 0);
    assert!(
        (report.tepe - EXPECTED_TEPE).abs() < 5e-4,
        "TEPE {} differs from {}",
        report.tepe,
        EXPECTED_TEPE
    );
}
