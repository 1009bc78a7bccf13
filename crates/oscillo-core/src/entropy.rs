//! Multi-input entropy source with a prefilled normalized-draw ring.
//!
//! Architecture:
//! 1. Draw `n` bytes from every registered input
//! 2. Rotate each draw by its input's rotation inside the `n`-byte width
//! 3. XOR the rotated draws together
//! 4. Whiten the result with SHA-256 truncated back to `n` bytes
//! 5. On any failure fall back to the OS device, then to a time scrambler
//!
//! Every public method is total. Failures are counted and show up in
//! [`EntropyQuality::success_rate`] instead of reaching the caller.
//!
//! The mixer is a simulation scrambler, not a vetted CSPRNG.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::conditioning::{MAX_DRAW_BYTES, rotate_left_within, u128_from_le, whiten};
use crate::config::EngineConfig;
use crate::error::EntropyError;
use crate::metrics::finite_or_zero;
use crate::platform::{PlatformInfo, platform_info};
use crate::source::{EntropyInput, InputState};
use crate::sources::os::OsInput;
use crate::sources::timing::time_scramble;
use crate::sources::detect_available_inputs;

/// Tag reported for the combined mixer.
pub const ENTROPY_SOURCE_TAG: &str = "secure_combined";

/// Normalization modulus: a draw maps to `(draw % 1e6) / 1e6`.
const NORMALIZE_MODULUS: u128 = 1_000_000;

/// Byte width of the draws that feed the normalized ring.
const RING_DRAW_BYTES: usize = 4;

/// Multi-input entropy source.
///
/// Not synchronized. Hosts that share one instance across threads wrap it in
/// a `Mutex`.
pub struct EntropySource {
    inputs: Vec<InputState>,
    fallback: InputState,
    ring: Vec<f64>,
    capacity: usize,
    refill_threshold: usize,
    successful_calls: u64,
    failed_calls: u64,
    total_entropy_bits: u64,
    platform: PlatformInfo,
}

impl EntropySource {
    /// Source with every available built-in input and default sizes.
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    /// Source with every available built-in input, sized from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_inputs(
            detect_available_inputs(),
            Box::new(OsInput),
            config.entropy_buffer_size,
            config.entropy_refill_threshold,
        )
    }

    /// Source with explicit inputs and fallback.
    ///
    /// The ring is prefilled to `buffer_size` before returning.
    pub fn with_inputs(
        inputs: Vec<Box<dyn EntropyInput>>,
        fallback: Box<dyn EntropyInput>,
        buffer_size: usize,
        refill_threshold: usize,
    ) -> Self {
        let platform = platform_info();
        info!(
            "initializing entropy source on {} {} with {} inputs",
            platform.system,
            platform.machine,
            inputs.len()
        );
        let capacity = buffer_size.max(1);
        let mut source = Self {
            inputs: inputs.into_iter().map(InputState::new).collect(),
            fallback: InputState::new(fallback),
            ring: Vec::with_capacity(capacity),
            capacity,
            refill_threshold: refill_threshold.clamp(1, capacity),
            successful_calls: 0,
            failed_calls: 0,
            total_entropy_bits: 0,
            platform,
        };
        source.refill();
        source
    }

    /// Number of registered inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Normalized draws currently waiting in the ring.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Mixed, whitened draw in `[0, 256^n_bytes)`.
    ///
    /// Widths above 16 bytes are clamped to 16; width 0 returns 0.
    pub fn get_secure_entropy(&mut self, n_bytes: usize) -> u128 {
        let n = n_bytes.min(MAX_DRAW_BYTES);
        if n == 0 {
            return 0;
        }
        match self.mix(n) {
            Ok(v) => {
                self.successful_calls += 1;
                self.total_entropy_bits += (n * 8) as u64;
                v
            }
            Err(e) => {
                warn!("secure entropy mixing failed: {e}; using fallback");
                self.failed_calls += 1;
                self.emergency(n)
            }
        }
    }

    fn mix(&mut self, n: usize) -> Result<u128, EntropyError> {
        if self.inputs.is_empty() {
            return Err(EntropyError::Unavailable("mixer"));
        }
        let mut combined = 0u128;
        for state in &mut self.inputs {
            let bytes = state.draw(n)?;
            let value = u128_from_le(&bytes, n);
            combined ^= rotate_left_within(value, state.input.info().rotation, n);
        }
        Ok(whiten(combined, n))
    }

    fn emergency(&mut self, n: usize) -> u128 {
        match self.fallback.draw(n) {
            Ok(bytes) => u128_from_le(&bytes, n),
            Err(e) => {
                error!("all entropy inputs failed: {e}; using time-based fallback");
                self.failed_calls += 1;
                time_scramble(n)
            }
        }
    }

    fn refill(&mut self) {
        let before = self.ring.len();
        while self.ring.len() < self.capacity {
            let draw = self.get_secure_entropy(RING_DRAW_BYTES);
            self.ring.push(normalize(draw));
        }
        debug!("entropy ring refilled: {before} -> {}", self.ring.len());
    }

    /// Normalized draw in `[0, 1)` served from the prefilled ring.
    pub fn get_normalized_entropy(&mut self) -> f64 {
        if self.ring.len() < self.refill_threshold {
            self.refill();
        }
        match self.ring.pop() {
            Some(v) => v,
            None => normalize(self.get_secure_entropy(RING_DRAW_BYTES)),
        }
    }

    /// Weighted (1/(i+1)) mean of `history_length` normalized draws,
    /// centered on zero and scaled by 0.2. Range `[-0.1, 0.1)`.
    pub fn get_pink_noise_component(&mut self, history_length: usize) -> f64 {
        if history_length == 0 {
            return 0.0;
        }
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for i in 0..history_length {
            let w = 1.0 / (i as f64 + 1.0);
            weighted_sum += self.get_normalized_entropy() * w;
            weight_sum += w;
        }
        (weighted_sum / weight_sum - 0.5) * 0.2
    }

    /// Three normalized draws weighted 0.5/0.3/0.2, centered, scaled by
    /// `base_amplitude`.
    pub fn get_thermal_oscillation(&mut self, base_amplitude: f64) -> f64 {
        let e1 = self.get_normalized_entropy();
        let e2 = self.get_normalized_entropy();
        let e3 = self.get_normalized_entropy();
        finite_or_zero(((e1 * 0.5 + e2 * 0.3 + e3 * 0.2) - 0.5) * base_amplitude)
    }

    /// Quality snapshot: call counters and informational platform tags.
    pub fn assess_entropy_quality(&self) -> EntropyQuality {
        let calls = self.successful_calls + self.failed_calls;
        let success_rate = if calls > 0 {
            self.successful_calls as f64 / calls as f64
        } else {
            0.0
        };
        EntropyQuality {
            entropy_source: ENTROPY_SOURCE_TAG.to_string(),
            success_rate,
            successful_calls: self.successful_calls,
            failed_calls: self.failed_calls,
            total_entropy_bits: self.total_entropy_bits,
            buffer_size: self.ring.len(),
            secure_mode: true,
            system: self.platform.system.clone(),
            architecture: self.platform.machine.clone(),
            has_rdrand: self.platform.has_rdrand,
            has_rdseed: self.platform.has_rdseed,
            entropy_sources: self
                .inputs
                .iter()
                .map(|s| s.input.name().to_string())
                .collect(),
        }
    }

    /// Per-input health.
    pub fn input_health(&self) -> Vec<InputHealth> {
        self.inputs
            .iter()
            .map(|s| {
                let info = s.input.info();
                InputHealth {
                    name: info.name.to_string(),
                    description: info.description.to_string(),
                    category: info.category.to_string(),
                    rotation: info.rotation,
                    healthy: s.healthy,
                    bytes: s.total_bytes,
                    failures: s.failures,
                }
            })
            .collect()
    }

    /// Draw `samples` fresh raw/normalized pairs and report them with the
    /// current quality snapshot.
    pub fn entropy_status(&mut self, samples: usize) -> EntropyStatus {
        let recent: Vec<EntropySample> = (0..samples)
            .map(|_| EntropySample {
                raw_value: self.get_secure_entropy(RING_DRAW_BYTES) as u64,
                normalized: self.get_normalized_entropy(),
            })
            .collect();
        let normalized: Vec<f64> = recent.iter().map(|s| s.normalized).collect();
        EntropyStatus {
            quality: self.assess_entropy_quality(),
            statistics: DrawStatistics::from_values(&normalized),
            recent_samples: recent,
            inputs: self.input_health(),
        }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(draw: u128) -> f64 {
    (draw % NORMALIZE_MODULUS) as f64 / NORMALIZE_MODULUS as f64
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Quality snapshot of an [`EntropySource`].
///
/// Platform fields are informational; nothing branches on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyQuality {
    pub entropy_source: String,
    /// successful / (successful + failed); 0.0 before the first call.
    pub success_rate: f64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_entropy_bits: u64,
    /// Normalized draws waiting in the ring.
    pub buffer_size: usize,
    pub secure_mode: bool,
    pub system: String,
    pub architecture: String,
    pub has_rdrand: bool,
    pub has_rdseed: bool,
    pub entropy_sources: Vec<String>,
}

/// Health of a single registered input.
#[derive(Debug, Clone, Serialize)]
pub struct InputHealth {
    pub name: String,
    pub description: String,
    pub category: String,
    pub rotation: u32,
    pub healthy: bool,
    pub bytes: u64,
    pub failures: u64,
}

/// One raw draw and one normalized draw.
#[derive(Debug, Clone, Serialize)]
pub struct EntropySample {
    pub raw_value: u64,
    pub normalized: f64,
}

/// Summary statistics over normalized draws.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DrawStatistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DrawStatistics {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            mean: finite_or_zero(values.iter().mean()),
            std: finite_or_zero(values.iter().population_std_dev()),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Status report combining fresh draws with quality and input health.
#[derive(Debug, Clone, Serialize)]
pub struct EntropyStatus {
    pub quality: EntropyQuality,
    pub recent_samples: Vec<EntropySample>,
    pub statistics: DrawStatistics,
    pub inputs: Vec<InputHealth>,
}
