//! `oscillo metrics`: compute oscillation metrics from a snapshot file.

use std::path::Path;

use oscillo_core::{EngineConfig, EntropySource, OscillationBuffer, compute_metrics};

pub fn run(input: &str, with_entropy: bool, resample: Option<usize>) {
    let snapshot = match super::read_snapshot(Path::new(input)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let capacity = snapshot.len().max(1);
    let buffer = match OscillationBuffer::from_snapshot(&snapshot, capacity) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Invalid snapshot {input}: {e}");
            std::process::exit(1);
        }
    };

    let values = match resample {
        Some(n) => buffer.resample(n),
        None => buffer.values(),
    };
    let quality = with_entropy.then(|| {
        let mut source = EntropySource::from_config(&EngineConfig::from_env());
        // Draw once so the success rate reflects a live source.
        source.get_secure_entropy(4);
        source.assess_entropy_quality()
    });

    let metrics = compute_metrics(&values, quality.as_ref());
    log::info!("computed {} metrics over {} values", metrics.data_level(), values.len());
    super::write_json(&metrics, None, "Metrics");
}
