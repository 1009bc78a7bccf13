//! `oscillo pink`: generate a pink noise series.

use oscillo_core::{
    EngineConfig, EntropySource, OscillationMetrics, PinkNoiseGenerator, SpectralCharacteristics,
    compute_metrics,
};
use serde::Serialize;

#[derive(Serialize)]
struct PinkReport {
    octaves: u32,
    values: Vec<f64>,
    characteristics: SpectralCharacteristics,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<OscillationMetrics>,
}

pub fn run(count: usize, octaves: u32, with_metrics: bool, output: Option<&str>) {
    let config = EngineConfig {
        pink_octaves: octaves,
        pink_history_cap: count.max(1),
        ..EngineConfig::from_env()
    }
    .normalized();
    let mut source = EntropySource::from_config(&config);
    let mut generator = PinkNoiseGenerator::from_config(&mut source, &config);

    let values: Vec<f64> = (0..count).map(|_| generator.generate(&mut source)).collect();
    let metrics = with_metrics.then(|| compute_metrics(&values, Some(&source.assess_entropy_quality())));

    let report = PinkReport {
        octaves: generator.octaves(),
        characteristics: generator.get_spectral_characteristics(),
        values,
        metrics,
    };
    super::write_json(&report, output, "Pink noise series");
}
