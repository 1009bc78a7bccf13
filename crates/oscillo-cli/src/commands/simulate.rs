//! `oscillo simulate`: drive a session through the oscillation lifecycle.
//!
//! Sessions live in a JSON directory store, so a later run can resume one
//! with `--session <id>` and pick up its recorded patterns and conversations.

use oscillo_core::{
    EngineConfig, JsonDirStore, OscillationEngine, OscillationMetrics, OscillationPattern,
    RestoreReport,
};
use serde::Serialize;

pub struct SimulateArgs<'a> {
    pub store: &'a str,
    pub session: Option<&'a str>,
    pub character: &'a str,
    pub patterns: usize,
    pub conversations: usize,
    pub use_entropy: bool,
    pub min_samples: Option<usize>,
    pub snapshot: Option<&'a str>,
    pub end: bool,
}

#[derive(Serialize)]
struct SimulationReport {
    session_id: String,
    resumed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    restore: Option<RestoreReport>,
    buffer_len: usize,
    metrics: OscillationMetrics,
}

/// Literal history for the `n`th pattern when entropy generation is off.
fn literal_pattern(n: usize) -> OscillationPattern {
    let mut pattern = OscillationPattern {
        secure_entropy_enabled: false,
        phase: n as f64 * 0.4,
        ..Default::default()
    };
    for i in 0..8 {
        let t = i as f64 * 0.25;
        let v = pattern.amplitude * (std::f64::consts::TAU * pattern.frequency * t + pattern.phase).sin();
        pattern.add_to_history(v * pattern.damping_factor(), oscillo_core::pattern::MAX_PATTERN_HISTORY);
    }
    pattern
}

pub fn run(args: &SimulateArgs<'_>) {
    let mut config = EngineConfig::from_env();
    if let Some(n) = args.min_samples {
        config.min_samples = n;
    }

    let store = match JsonDirStore::open(args.store) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Cannot open session store {}: {e}", args.store);
            std::process::exit(1);
        }
    };
    let mut engine = OscillationEngine::new(config, Box::new(store));

    let (session_id, restore) = match args.session {
        Some(id) => match engine.resume_session(id) {
            Ok(report) => {
                eprintln!("{report}");
                (id.to_string(), Some(report))
            }
            Err(e) => {
                eprintln!("Cannot resume session: {e}");
                std::process::exit(1);
            }
        },
        None => {
            let id = engine.start_session(args.character);
            eprintln!("Started session {id}");
            (id, None)
        }
    };

    if let Err(e) = feed(&mut engine, &session_id, args) {
        eprintln!("Simulation failed: {e}");
        std::process::exit(1);
    }

    let metrics = match engine.metrics(&session_id) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Cannot compute metrics: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = args.snapshot {
        match engine.export(&session_id) {
            Ok(snapshot) => super::write_json(&snapshot, Some(path), "Snapshot"),
            Err(e) => eprintln!("Cannot export snapshot: {e}"),
        }
    }

    let report = SimulationReport {
        buffer_len: engine.buffer(&session_id).map_or(0, |b| b.len()),
        resumed: restore.is_some(),
        session_id: session_id.clone(),
        restore,
        metrics,
    };
    super::write_json(&report, None, "Simulation");

    if args.end {
        if let Err(e) = engine.end_session(&session_id) {
            eprintln!("Cannot end session: {e}");
        }
    }
}

fn feed(engine: &mut OscillationEngine, session_id: &str, args: &SimulateArgs<'_>) -> oscillo_core::Result<()> {
    for n in 0..args.patterns {
        let pattern = if args.use_entropy {
            OscillationPattern::default()
        } else {
            literal_pattern(n)
        };
        engine.add_oscillation_pattern(session_id, pattern)?;
    }
    for _ in 0..args.conversations {
        engine.record_conversation(session_id, None)?;
    }
    log::debug!(
        "fed {} patterns and {} conversations into {session_id}",
        args.patterns,
        args.conversations
    );
    Ok(())
}
