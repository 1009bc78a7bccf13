//! # oscillo-core
//!
//! **A secure oscillation engine for simulated conversational sessions.**
//!
//! `oscillo-core` mixes several randomness inputs into normalized draws,
//! shapes them into 1/f ("pink") noise, keeps a bounded rolling history of a
//! scalar signal per session and computes tiered statistical, spectral and
//! chaos metrics over that history.
//!
//! ## Quick Start
//!
//! ```no_run
//! use oscillo_core::{EngineConfig, MemoryStore, OscillationEngine};
//!
//! let mut engine = OscillationEngine::new(EngineConfig::default(), Box::new(MemoryStore::new()));
//! let session = engine.start_session("alice");
//!
//! engine.record_conversation(&session, None).unwrap();
//! let metrics = engine.metrics(&session).unwrap();
//! println!("{}", serde_json::to_string_pretty(&metrics).unwrap());
//! ```
//!
//! ## Architecture
//!
//! Inputs → EntropySource (XOR/rotate, SHA-256 whitening, ring buffer)
//! → PinkNoiseGenerator / thermal draws → OscillationBuffer → metrics
//!
//! The entropy mixer is a best-effort scrambler for simulation. It is not a
//! vetted CSPRNG and must not be used where real security guarantees are
//! required.
//!
//! [`OscillationEngine`] orchestrates everything against session events and an
//! [`OscillationStore`]. Each component is also usable on its own.

pub mod buffer;
pub mod conditioning;
pub mod config;
pub mod entropy;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod pattern;
pub mod pink_noise;
pub mod platform;
pub mod session;
pub mod source;
pub mod sources;
pub mod store;
pub mod timestamp;

pub use buffer::{BufferStatistics, OscillationBuffer, OscillationSample, OscillationSnapshot};
pub use config::EngineConfig;
pub use entropy::{EntropyQuality, EntropySample, EntropySource, EntropyStatus, InputHealth};
pub use error::{EntropyError, OscillationError, Result, StoreError};
pub use lifecycle::{MAX_SESSION_SAMPLES, OscillationEngine, RestoreFailure, RestoreReport};
pub use metrics::{DataLevel, OscillationMetrics, compute_metrics};
pub use pattern::{ConversationRecord, DampingType, OscillationPattern, OscillationPatternRecord};
pub use pink_noise::{PinkNoiseGenerator, SpectralCharacteristics};
pub use platform::{PlatformInfo, platform_info};
pub use session::{SessionEnvironment, SessionState, SessionUpdate};
pub use source::{EntropyInput, InputCategory, InputInfo};
pub use store::{JsonDirStore, MemoryStore, OscillationStore, StoredRecords};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
