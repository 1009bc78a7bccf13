//! `oscillo entropy`: draw from the entropy source and report on it.

use oscillo_core::{EngineConfig, EntropySource};

pub fn run(samples: usize, output: Option<&str>) {
    let config = EngineConfig::from_env();
    let mut source = EntropySource::from_config(&config);
    let status = source.entropy_status(samples);

    if output.is_some() {
        super::write_json(&status, output, "Entropy report");
        return;
    }

    let q = &status.quality;
    println!("Entropy source: {} ({} inputs)", q.entropy_source, source.input_count());
    println!(
        "Platform: {} / {}  rdrand={} rdseed={}",
        q.system, q.architecture, q.has_rdrand, q.has_rdseed
    );
    println!(
        "Calls: {} ok, {} failed  (success rate {:.3}, {} bits generated)\n",
        q.successful_calls, q.failed_calls, q.success_rate, q.total_entropy_bits
    );

    println!("  {:<14} {:<8} {:>8} {:>6} {:>9}", "Input", "Kind", "Rotation", "Bytes", "Failures");
    println!("  {}", "-".repeat(50));
    for input in &status.inputs {
        let mark = if input.healthy { "" } else { "  (unhealthy)" };
        println!(
            "  {:<14} {:<8} {:>8} {:>6} {:>9}{mark}",
            input.name, input.category, input.rotation, input.bytes, input.failures
        );
    }

    if !status.recent_samples.is_empty() {
        println!("\n  {:>12}  {:>10}", "Raw", "Normalized");
        for s in &status.recent_samples {
            println!("  {:>12}  {:>10.6}", s.raw_value, s.normalized);
        }
        let st = &status.statistics;
        println!(
            "\nNormalized draws: mean {:.4}  std {:.4}  min {:.4}  max {:.4}",
            st.mean, st.std, st.min, st.max
        );
    }
}
