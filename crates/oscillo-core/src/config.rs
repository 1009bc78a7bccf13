//! Engine configuration.
//!
//! Defaults match the reference deployment. [`EngineConfig::from_env`] lets a
//! host override the sizes through environment variables.

use log::warn;

/// Environment key for the per-session buffer capacity.
pub const ENV_BUFFER_SIZE: &str = "OSCILLATION_BUFFER_SIZE";
/// Environment key for the minimum sample count kept in every buffer.
pub const ENV_MIN_SAMPLES: &str = "MIN_OSCILLATION_SAMPLES";
/// Environment key for the normalized-entropy prefill capacity.
pub const ENV_ENTROPY_BUFFER_SIZE: &str = "ENTROPY_BUFFER_SIZE";

/// Configuration shared by every component of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Hard cap on samples held per session buffer.
    pub buffer_capacity: usize,
    /// Buffers are topped up to this many samples before metrics are taken.
    pub min_samples: usize,
    /// Capacity of the normalized-entropy prefill ring.
    pub entropy_buffer_size: usize,
    /// The prefill ring is refilled once fewer than this many draws remain.
    pub entropy_refill_threshold: usize,
    /// Number of Voss-McCartney octaves.
    pub pink_octaves: u32,
    /// Number of pink-noise outputs retained for spectral characteristics.
    pub pink_history_cap: usize,
    /// Amplitude of the thermal draws used to seed and pad buffers.
    pub seed_amplitude: f64,
    /// Maximum records fetched per record kind when restoring a session.
    pub restore_record_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            min_samples: 5,
            entropy_buffer_size: 1000,
            entropy_refill_threshold: 10,
            pink_octaves: 5,
            pink_history_cap: 100,
            seed_amplitude: 0.3,
            restore_record_limit: 50,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by an arbitrary key lookup.
    ///
    /// Unparseable or zero values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_positive(&lookup, ENV_BUFFER_SIZE) {
            config.buffer_capacity = v;
        }
        if let Some(v) = parse_positive(&lookup, ENV_MIN_SAMPLES) {
            config.min_samples = v;
        }
        if let Some(v) = parse_positive(&lookup, ENV_ENTROPY_BUFFER_SIZE) {
            config.entropy_buffer_size = v;
        }
        config.normalized()
    }

    /// Clamp fields into ranges the components can operate with.
    pub fn normalized(mut self) -> Self {
        self.buffer_capacity = self.buffer_capacity.max(1);
        self.min_samples = self.min_samples.min(self.buffer_capacity);
        self.entropy_buffer_size = self.entropy_buffer_size.max(1);
        self.entropy_refill_threshold = self.entropy_refill_threshold.min(self.entropy_buffer_size);
        self.pink_octaves = self.pink_octaves.clamp(1, 16);
        self.pink_history_cap = self.pink_history_cap.max(1);
        if !self.seed_amplitude.is_finite() {
            self.seed_amplitude = 0.3;
        }
        self
    }
}

fn parse_positive<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            warn!("ignoring {key}={raw:?}: expected a positive integer");
            None
        }
    }
}
