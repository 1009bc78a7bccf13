//! Integration tests for oscillo-core.
//!
//! These tests drive the public API end to end:
//! entropy draws → pink noise → session buffers → metrics → persistence.

use std::f64::consts::PI;

use oscillo_core::{
    DataLevel, EngineConfig, EntropySource, JsonDirStore, MemoryStore, OscillationBuffer,
    OscillationEngine, OscillationPattern, OscillationStore, PinkNoiseGenerator, compute_metrics,
};
use statrs::distribution::{ChiSquared, ContinuousCDF};

fn small_config() -> EngineConfig {
    EngineConfig {
        entropy_buffer_size: 256,
        ..Default::default()
    }
}

#[test]
fn normalized_entropy_is_uniform_enough() {
    let mut source = EntropySource::from_config(&small_config());
    const BINS: usize = 20;
    const N: usize = 100_000;
    let mut counts = [0usize; BINS];
    for _ in 0..N {
        let v = source.get_normalized_entropy();
        assert!((0.0..1.0).contains(&v), "out of range: {v}");
        counts[((v * BINS as f64) as usize).min(BINS - 1)] += 1;
    }

    let expected = N as f64 / BINS as f64;
    let chi2: f64 = counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum();
    let critical = ChiSquared::new((BINS - 1) as f64)
        .unwrap()
        .inverse_cdf(0.9999);
    assert!(
        chi2 < critical,
        "chi-squared {chi2:.1} exceeds critical value {critical:.1}"
    );
}

#[test]
fn secure_entropy_width_bounds() {
    let mut source = EntropySource::from_config(&small_config());
    for k in [1usize, 4, 8, 16] {
        for _ in 0..200 {
            let v = source.get_secure_entropy(k);
            if k < 16 {
                assert!(v < 1u128 << (8 * k), "width {k} produced {v}");
            }
        }
    }
    let mut seen: Vec<u128> = (0..100).map(|_| source.get_secure_entropy(4)).collect();
    seen.sort_unstable();
    seen.dedup();
    assert!(seen.len() > 95, "only {} distinct 4-byte draws", seen.len());
}

#[test]
fn buffer_evicts_oldest() {
    let mut buffer = OscillationBuffer::new(100);
    for i in 0..150 {
        buffer.add(i as f64, None);
        assert!(buffer.len() <= 100);
    }
    assert_eq!(buffer.len(), 100);
    assert_eq!(buffer.values()[0], 50.0);
}

#[test]
fn pink_noise_reset_keeps_bounds() {
    let mut source = EntropySource::from_config(&small_config());
    let mut pink = PinkNoiseGenerator::new(&mut source, 5);
    for _ in 0..37 {
        pink.generate(&mut source);
    }
    pink.reset(&mut source);
    assert_eq!(pink.key(), 0);
    assert_eq!(pink.get_spectral_characteristics().history_length, 0);
    for _ in 0..500 {
        let v = pink.generate(&mut source);
        assert!((-1.0..=1.0).contains(&v));
    }
}

#[test]
fn metrics_tiers_from_public_api() {
    let m = compute_metrics(&[0.1, 0.2], None);
    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["data_level"], "insufficient");
    assert!(json.get("error").is_some());

    let m = compute_metrics(&[0.1, 0.3, 0.2, 0.4], None);
    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["data_level"], "basic");
    assert!(json.get("mean").is_some());
    assert!(json.get("std").is_some());
    assert!(json.get("stability").is_some());
    assert!(json.get("dominant_frequency").is_none());
}

#[test]
fn sine_wave_dominant_frequency() {
    let mut source = EntropySource::from_config(&small_config());
    let values: Vec<f64> = (0..100)
        .map(|i| {
            let t = i as f64 * 0.1;
            let noise = (source.get_normalized_entropy() - 0.5) * 0.05;
            0.3 * (2.0 * PI * 0.5 * t).sin() + noise
        })
        .collect();
    let m = compute_metrics(&values, Some(&source.assess_entropy_quality()));
    assert_eq!(m.data_level(), DataLevel::Full);
    let f = m.dominant_frequency().unwrap();
    // 0.5 Hz at 10 samples per second is bin 5 of 100.
    assert!((f - 0.05).abs() <= 0.011, "dominant frequency {f}");
    assert_eq!(m.entropy().unwrap().security_level, "high");
}

#[test]
fn resume_round_trip_through_snapshot() {
    let mut engine = OscillationEngine::new(small_config(), Box::new(MemoryStore::new()));
    let session = engine.start_session("alice");
    for i in 0..10 {
        engine.record_conversation(&session, Some((i as f64 * 0.7).sin() * 0.2)).unwrap();
    }
    let exported = engine.export(&session).unwrap();
    let json = serde_json::to_string(&exported).unwrap();

    engine.clear_buffer(&session).unwrap();
    assert!(engine.buffer(&session).unwrap().is_empty());

    let snapshot = serde_json::from_str(&json).unwrap();
    let report = engine.restore_from_snapshot(&session, &snapshot).unwrap();
    assert_eq!(report.recovered, exported.len());

    let buffer = engine.buffer(&session).unwrap();
    let restored = buffer.values();
    for v in &exported.values {
        assert!(
            restored.iter().any(|r| (r - v).abs() < 1e-12),
            "lost value {v}"
        );
    }
    let ts = buffer.timestamps();
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn ensure_sufficient_is_idempotent_above_minimum() {
    let mut engine = OscillationEngine::new(small_config(), Box::new(MemoryStore::new()));
    let session = engine.start_session("alice");
    engine.clear_buffer(&session).unwrap();
    assert_eq!(engine.ensure_sufficient(&session, 5).unwrap(), 5);
    assert_eq!(engine.buffer(&session).unwrap().len(), 5);

    engine.record_conversation(&session, Some(0.0)).unwrap();
    engine.record_conversation(&session, Some(0.0)).unwrap();
    let before = engine.export(&session).unwrap();
    assert_eq!(engine.ensure_sufficient(&session, 5).unwrap(), 0);
    assert_eq!(engine.export(&session).unwrap(), before);
}

#[test]
fn session_survives_process_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let session = {
        let store = JsonDirStore::open(dir.path()).unwrap();
        let mut engine = OscillationEngine::new(small_config(), Box::new(store));
        let session = engine.start_session("alice");
        engine
            .add_oscillation_pattern(&session, OscillationPattern::default())
            .unwrap();
        engine.record_conversation(&session, Some(0.01)).unwrap();
        session
    };

    let store = JsonDirStore::open(dir.path()).unwrap();
    assert_eq!(store.list_sessions().unwrap(), vec![session.clone()]);
    assert_eq!(store.load_session(&session).unwrap().unwrap().interaction_count, 1);

    let mut engine = OscillationEngine::new(small_config(), Box::new(store));
    let report = engine.resume_session(&session).unwrap();
    // 20 generated pattern values plus one conversation value.
    assert_eq!(report.attempted, 21);
    assert_eq!(report.recovered, 21);
    assert_eq!(report.synthesized, 0);

    let metrics = engine.metrics(&session).unwrap();
    assert_eq!(metrics.data_level(), DataLevel::Full);
    assert!(metrics.pink_noise().is_some());
}
