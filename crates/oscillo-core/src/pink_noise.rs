//! Voss-McCartney 1/f noise driven by an [`EntropySource`].
//!
//! `O` octave generators hold white values in `[-1, 1)`. A key counter runs
//! modulo `2^O`; on every step the octaves whose key bit toggled are redrawn,
//! so octave `i` refreshes every `2^i` steps. The output is the octave mean
//! blended with a small thermal draw and exponentially smoothed.

use std::collections::VecDeque;

use serde::Serialize;

use crate::buffer::BufferStatistics;
use crate::config::EngineConfig;
use crate::entropy::EntropySource;

/// Weight of the octave mean in each output.
const PINK_WEIGHT: f64 = 0.8;
/// Weight of the fresh thermal draw in each output.
const THERMAL_WEIGHT: f64 = 0.2;
/// Amplitude of the thermal draw blended into each output.
const THERMAL_AMPLITUDE: f64 = 0.1;
/// Weight of the previous output in the smoothing step.
const SMOOTHING: f64 = 0.7;

/// Voss-McCartney pink noise generator.
#[derive(Debug, Clone)]
pub struct PinkNoiseGenerator {
    octaves: u32,
    key_mask: u32,
    key: u32,
    white: Vec<f64>,
    history: VecDeque<f64>,
    history_cap: usize,
}

impl PinkNoiseGenerator {
    /// Generator with `octaves` octaves (clamped to 1..=16) and a history
    /// cap of 100.
    pub fn new(entropy: &mut EntropySource, octaves: u32) -> Self {
        Self::with_history_cap(entropy, octaves, 100)
    }

    /// Generator sized from `config`.
    pub fn from_config(entropy: &mut EntropySource, config: &EngineConfig) -> Self {
        Self::with_history_cap(entropy, config.pink_octaves, config.pink_history_cap)
    }

    pub fn with_history_cap(entropy: &mut EntropySource, octaves: u32, history_cap: usize) -> Self {
        let octaves = octaves.clamp(1, 16);
        let mut g = Self {
            octaves,
            key_mask: (1u32 << octaves) - 1,
            key: 0,
            white: Vec::with_capacity(octaves as usize),
            history: VecDeque::with_capacity(history_cap.max(1)),
            history_cap: history_cap.max(1),
        };
        g.redraw_all(entropy);
        g
    }

    fn redraw_all(&mut self, entropy: &mut EntropySource) {
        self.white.clear();
        for _ in 0..self.octaves {
            self.white.push(white_value(entropy));
        }
    }

    /// Next pink noise value, bounded in `[-1, 1]`.
    pub fn generate(&mut self, entropy: &mut EntropySource) -> f64 {
        let last_key = self.key;
        self.key = (self.key + 1) & self.key_mask;
        let toggled = last_key ^ self.key;

        for (i, w) in self.white.iter_mut().enumerate() {
            if toggled & (1 << i) != 0 {
                *w = white_value(entropy);
            }
        }

        let pink = self.white.iter().sum::<f64>() / self.octaves as f64;
        let thermal = entropy.get_thermal_oscillation(THERMAL_AMPLITUDE);
        let blended = pink * PINK_WEIGHT + thermal * THERMAL_WEIGHT;

        let out = match self.history.back() {
            Some(&prev) => prev * SMOOTHING + blended * (1.0 - SMOOTHING),
            None => blended,
        };
        let out = if out.is_finite() { out.clamp(-1.0, 1.0) } else { 0.0 };

        self.history.push_back(out);
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
        out
    }

    /// Key to 0, every octave redrawn, history cleared.
    pub fn reset(&mut self, entropy: &mut EntropySource) {
        self.key = 0;
        self.history.clear();
        self.redraw_all(entropy);
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    /// Up to `length` most recent outputs, oldest first.
    pub fn history(&self, length: usize) -> Vec<f64> {
        let skip = self.history.len().saturating_sub(length);
        self.history.iter().skip(skip).copied().collect()
    }

    /// Summary statistics over the retained history.
    pub fn get_spectral_characteristics(&self) -> SpectralCharacteristics {
        let values: Vec<f64> = self.history.iter().copied().collect();
        let stats = BufferStatistics::from_values(&values);
        SpectralCharacteristics {
            average: stats.mean,
            variance: stats.variance,
            std_deviation: stats.std,
            min: stats.min,
            max: stats.max,
            history_length: stats.count,
            octaves: self.octaves,
        }
    }
}

fn white_value(entropy: &mut EntropySource) -> f64 {
    entropy.get_normalized_entropy() * 2.0 - 1.0
}

/// Statistics over a generator's output history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpectralCharacteristics {
    pub average: f64,
    pub variance: f64,
    pub std_deviation: f64,
    pub min: f64,
    pub max: f64,
    pub history_length: usize,
    pub octaves: u32,
}
