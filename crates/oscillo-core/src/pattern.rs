//! Oscillation patterns and the persisted records built from them.

use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::Result;
use crate::metrics::finite_or_zero;
use crate::timestamp::{format_iso8601, parse_iso8601};

/// Hard cap on a pattern's materialized history.
pub const MAX_PATTERN_HISTORY: usize = 1000;

/// Damping regime of a pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DampingType {
    #[default]
    Underdamped,
    CriticallyDamped,
    Overdamped,
    /// Any other string found in a stored record. Applies no damping.
    #[serde(other)]
    Undamped,
}

impl DampingType {
    /// Fraction of the damping coefficient removed per step.
    fn rate(&self) -> f64 {
        match self {
            Self::Underdamped => 0.1,
            Self::CriticallyDamped => 0.5,
            Self::Overdamped => 0.8,
            Self::Undamped => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Underdamped => "underdamped",
            Self::CriticallyDamped => "critically_damped",
            Self::Overdamped => "overdamped",
            Self::Undamped => "undamped",
        }
    }
}

/// Generative description of an oscillation plus its materialized history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillationPattern {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,

    pub pink_noise_enabled: bool,
    pub pink_noise_intensity: f64,
    pub spectral_slope: f64,

    pub damping_coefficient: f64,
    pub damping_type: DampingType,
    pub natural_frequency: f64,
    pub current_velocity: f64,
    pub target_value: f64,

    pub chaotic_enabled: bool,
    pub lyapunov_exponent: f64,
    pub attractor_strength: f64,

    pub secure_entropy_enabled: bool,
    pub secure_entropy_intensity: f64,
    /// Quality snapshot captured when the pattern was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_source_info: Option<serde_json::Value>,

    #[serde(default)]
    pub history: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Default for OscillationPattern {
    fn default() -> Self {
        Self {
            amplitude: 0.3,
            frequency: 0.5,
            phase: 0.0,
            pink_noise_enabled: true,
            pink_noise_intensity: 0.15,
            spectral_slope: -1.0,
            damping_coefficient: 0.7,
            damping_type: DampingType::Underdamped,
            natural_frequency: 2.0,
            current_velocity: 0.0,
            target_value: 0.0,
            chaotic_enabled: false,
            lyapunov_exponent: 0.1,
            attractor_strength: 0.5,
            secure_entropy_enabled: true,
            secure_entropy_intensity: 0.15,
            entropy_source_info: None,
            history: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

impl OscillationPattern {
    /// Append a value, keeping at most `max_history` of the newest.
    pub fn add_to_history(&mut self, value: f64, max_history: usize) {
        self.history.push(finite_or_zero(value));
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
    }

    pub fn recent_history(&self, count: usize) -> &[f64] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    /// 1 / (1 + 10·variance) of the history; 1.0 with fewer than 2 values.
    pub fn stability(&self) -> f64 {
        if self.history.len() < 2 {
            return 1.0;
        }
        let variance = self.history.iter().population_variance();
        finite_or_zero(1.0 / (1.0 + variance * 10.0))
    }

    /// Mean absolute history value, or the configured amplitude when empty.
    pub fn average_amplitude(&self) -> f64 {
        if self.history.is_empty() {
            return self.amplitude;
        }
        finite_or_zero(self.history.iter().map(|v| v.abs()).mean())
    }

    /// True once the last 10 values have a standard deviation below `threshold`.
    pub fn is_converging(&self, threshold: f64) -> bool {
        if self.history.len() < 10 {
            return false;
        }
        self.recent_history(10).iter().population_std_dev() < threshold
    }

    pub fn phase_shift(&self) -> f64 {
        self.phase.rem_euclid(TAU)
    }

    /// Velocity from the last history value to `new_position` over `dt` seconds.
    pub fn update_velocity(&mut self, new_position: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        if let Some(&last) = self.history.last() {
            self.current_velocity = finite_or_zero((new_position - last) / dt);
        }
    }

    /// Multiplicative damping per step, in [0, 1].
    pub fn damping_factor(&self) -> f64 {
        let factor = 1.0 - self.damping_coefficient * self.damping_type.rate();
        finite_or_zero(factor).clamp(0.0, 1.0)
    }

    /// Kinetic plus potential energy at the latest history value.
    pub fn energy(&self) -> f64 {
        let kinetic = 0.5 * self.current_velocity.powi(2);
        let potential = self.history.last().map_or(0.0, |x| 0.5 * x.powi(2));
        finite_or_zero(kinetic + potential)
    }

    pub fn entropy_contribution(&self) -> f64 {
        if self.secure_entropy_enabled {
            self.secure_entropy_intensity
        } else {
            0.0
        }
    }

    /// Store record for `session_id`.
    pub fn to_record(&self, session_id: &str) -> OscillationPatternRecord {
        OscillationPatternRecord {
            session_id: session_id.to_string(),
            amplitude: finite_or_zero(self.amplitude),
            frequency: finite_or_zero(self.frequency),
            phase: finite_or_zero(self.phase),
            pink_noise_enabled: self.pink_noise_enabled,
            pink_noise_intensity: finite_or_zero(self.pink_noise_intensity),
            spectral_slope: finite_or_zero(self.spectral_slope),
            damping_coefficient: finite_or_zero(self.damping_coefficient),
            damping_type: self.damping_type,
            natural_frequency: finite_or_zero(self.natural_frequency),
            current_velocity: finite_or_zero(self.current_velocity),
            target_value: finite_or_zero(self.target_value),
            chaotic_enabled: self.chaotic_enabled,
            lyapunov_exponent: finite_or_zero(self.lyapunov_exponent),
            attractor_strength: finite_or_zero(self.attractor_strength),
            secure_entropy_enabled: self.secure_entropy_enabled,
            secure_entropy_intensity: finite_or_zero(self.secure_entropy_intensity),
            entropy_source_info: self.entropy_source_info.clone(),
            history: self.history.iter().copied().map(finite_or_zero).collect(),
            timestamp: format_iso8601(&self.timestamp),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// Pattern as exchanged with the store. The timestamp stays a string so a
/// malformed record can be skipped individually on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillationPatternRecord {
    pub session_id: String,
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
    pub pink_noise_enabled: bool,
    pub pink_noise_intensity: f64,
    pub spectral_slope: f64,
    pub damping_coefficient: f64,
    pub damping_type: DampingType,
    pub natural_frequency: f64,
    pub current_velocity: f64,
    pub target_value: f64,
    pub chaotic_enabled: bool,
    pub lyapunov_exponent: f64,
    pub attractor_strength: f64,
    pub secure_entropy_enabled: bool,
    pub secure_entropy_intensity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropy_source_info: Option<serde_json::Value>,
    #[serde(default)]
    pub history: Vec<f64>,
    pub timestamp: String,
}

impl OscillationPatternRecord {
    /// Back to a pattern. Fails only on an unparseable timestamp.
    pub fn to_pattern(&self) -> Result<OscillationPattern> {
        Ok(OscillationPattern {
            amplitude: self.amplitude,
            frequency: self.frequency,
            phase: self.phase,
            pink_noise_enabled: self.pink_noise_enabled,
            pink_noise_intensity: self.pink_noise_intensity,
            spectral_slope: self.spectral_slope,
            damping_coefficient: self.damping_coefficient,
            damping_type: self.damping_type,
            natural_frequency: self.natural_frequency,
            current_velocity: self.current_velocity,
            target_value: self.target_value,
            chaotic_enabled: self.chaotic_enabled,
            lyapunov_exponent: self.lyapunov_exponent,
            attractor_strength: self.attractor_strength,
            secure_entropy_enabled: self.secure_entropy_enabled,
            secure_entropy_intensity: self.secure_entropy_intensity,
            entropy_source_info: self.entropy_source_info.clone(),
            history: self.history.clone(),
            timestamp: parse_iso8601(&self.timestamp)?,
        })
    }
}

/// The part of a conversation record the engine reads and writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub session_id: String,
    pub oscillation_value: f64,
    pub timestamp: String,
}

impl ConversationRecord {
    pub fn new(session_id: &str, oscillation_value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            oscillation_value: finite_or_zero(oscillation_value),
            timestamp: format_iso8601(&timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern_with(history: &[f64]) -> OscillationPattern {
        OscillationPattern {
            history: history.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_history_cap() {
        let mut p = OscillationPattern::default();
        for i in 0..15 {
            p.add_to_history(i as f64, 10);
        }
        assert_eq!(p.history.len(), 10);
        assert_eq!(p.history[0], 5.0);
        assert_eq!(p.recent_history(3), &[12.0, 13.0, 14.0]);
        assert_eq!(p.recent_history(100).len(), 10);
        p.add_to_history(f64::NAN, MAX_PATTERN_HISTORY);
        assert_eq!(p.history.last(), Some(&0.0));
    }

    #[test]
    fn test_stability_and_amplitude() {
        let p = pattern_with(&[]);
        assert_eq!(p.stability(), 1.0);
        assert_eq!(p.average_amplitude(), 0.3);

        let p = pattern_with(&[0.5, -0.5, 0.5, -0.5]);
        assert!((p.stability() - 1.0 / 3.5).abs() < 1e-12);
        assert!((p.average_amplitude() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_convergence() {
        let mut p = pattern_with(&[0.2; 9]);
        assert!(!p.is_converging(0.01));
        p.add_to_history(0.2, MAX_PATTERN_HISTORY);
        assert!(p.is_converging(0.01));
        p.add_to_history(1.0, MAX_PATTERN_HISTORY);
        assert!(!p.is_converging(0.01));
    }

    #[test]
    fn test_phase_shift_wraps() {
        let p = OscillationPattern {
            phase: 7.0,
            ..Default::default()
        };
        assert!((p.phase_shift() - (7.0 - TAU)).abs() < 1e-12);
        let p = OscillationPattern {
            phase: -1.0,
            ..Default::default()
        };
        assert!((p.phase_shift() - (TAU - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_and_energy() {
        let mut p = pattern_with(&[0.5]);
        p.update_velocity(1.0, 0.0);
        assert_eq!(p.current_velocity, 0.0);
        p.update_velocity(1.0, 0.5);
        assert!((p.current_velocity - 1.0).abs() < 1e-12);
        assert!((p.energy() - (0.5 + 0.125)).abs() < 1e-12);

        let mut empty = pattern_with(&[]);
        empty.update_velocity(3.0, 1.0);
        assert_eq!(empty.current_velocity, 0.0);
        assert_eq!(empty.energy(), 0.0);
    }

    #[test]
    fn test_damping_factor() {
        let mut p = OscillationPattern::default();
        assert!((p.damping_factor() - 0.93).abs() < 1e-12);
        p.damping_type = DampingType::CriticallyDamped;
        assert!((p.damping_factor() - 0.65).abs() < 1e-12);
        p.damping_type = DampingType::Overdamped;
        p.damping_coefficient = 2.0;
        assert_eq!(p.damping_factor(), 0.0);
        p.damping_type = DampingType::Undamped;
        assert_eq!(p.damping_factor(), 1.0);
    }

    #[test]
    fn test_entropy_contribution() {
        let mut p = OscillationPattern::default();
        assert_eq!(p.entropy_contribution(), 0.15);
        p.secure_entropy_enabled = false;
        assert_eq!(p.entropy_contribution(), 0.0);
    }

    #[test]
    fn test_record_json_keys() {
        let p = pattern_with(&[0.1, 0.2]);
        let json = serde_json::to_value(p.to_record("s1")).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["damping_type"], "underdamped");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(json.get("entropy_source_info").is_none());
        assert_eq!(json["history"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_record_back_to_pattern() {
        let p = pattern_with(&[0.1, -0.4]);
        let restored = p.to_record("s").to_pattern().unwrap();
        assert_eq!(restored.history, p.history);
        assert_eq!(
            format_iso8601(&restored.timestamp),
            format_iso8601(&p.timestamp)
        );

        let mut bad = p.to_record("s");
        bad.timestamp = "not a time".into();
        assert!(bad.to_pattern().is_err());
    }

    #[test]
    fn test_unknown_damping_type_parses() {
        let t: DampingType = serde_json::from_str("\"springy\"").unwrap();
        assert_eq!(t, DampingType::Undamped);
        let t: DampingType = serde_json::from_str("\"critically_damped\"").unwrap();
        assert_eq!(t, DampingType::CriticallyDamped);
    }
}
