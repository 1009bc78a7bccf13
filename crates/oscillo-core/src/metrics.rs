//! Tiered statistical, spectral and chaos metrics over a signal history.
//!
//! The tier is chosen by sample count:
//!
//! | samples | tier           | adds                                          |
//! |---------|----------------|-----------------------------------------------|
//! | < 3     | `insufficient` | `count`, `error`                              |
//! | 3–4     | `basic`        | statistics, stability, volatility, trend      |
//! | 5–9     | `intermediate` | autocorrelations, randomness score            |
//! | ≥ 10    | `full`         | spectrum, pink-noise quality, chaos proxies   |
//!
//! [`compute_metrics`] is a pure function of the values and the optional
//! entropy quality snapshot. Every reported number is finite.
//!
//! The Lyapunov estimate and fractal dimension are heuristic proxies for
//! comparing histories with each other. They are not calibrated chaos-theory
//! measurements.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::Serialize;

use crate::buffer::BufferStatistics;
use crate::entropy::EntropyQuality;

/// Minimum samples for the `basic` tier.
pub const BASIC_MIN_SAMPLES: usize = 3;
/// Minimum samples for the `intermediate` tier.
pub const INTERMEDIATE_MIN_SAMPLES: usize = 5;
/// Minimum samples for the `full` tier.
pub const FULL_MIN_SAMPLES: usize = 10;

const MAX_AUTOCORR_LAG: usize = 10;
const TOP_FREQUENCIES: usize = 5;
const HISTOGRAM_BINS: usize = 10;
const IDEAL_PINK_SLOPE: f64 = -1.0;
const LOG_FLOOR: f64 = 1e-10;

/// Replace NaN and infinities with 0.0.
pub fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Sample-count tier of a metrics result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLevel {
    Insufficient,
    Basic,
    Intermediate,
    Full,
}

impl DataLevel {
    pub fn for_count(n: usize) -> Self {
        match n {
            n if n < BASIC_MIN_SAMPLES => Self::Insufficient,
            n if n < INTERMEDIATE_MIN_SAMPLES => Self::Basic,
            n if n < FULL_MIN_SAMPLES => Self::Intermediate,
            _ => Self::Full,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for DataLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stability, volatility and trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StabilityMetrics {
    /// 1 / (1 + 10·variance), in (0, 1].
    pub stability: f64,
    /// Population standard deviation of first differences.
    pub volatility: f64,
    /// Least-squares slope against sample index.
    pub trend: f64,
}

/// Autocorrelation at lags 1..=min(10, n/2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutocorrelationMetrics {
    pub autocorrelations: Vec<f64>,
    pub first_order_autocorr: f64,
    /// 1 − |lag-1 autocorrelation|.
    pub randomness_score: f64,
}

/// One spectral peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyPeak {
    /// Normalized frequency in cycles per sample, in (0, 0.5).
    pub frequency: f64,
    pub power: f64,
    /// Share of the total positive-frequency power.
    pub relative_power: f64,
}

/// FFT-based spectral analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralMetrics {
    pub dominant_frequency: f64,
    /// Total power over positive frequencies.
    pub spectral_power: f64,
    /// Top five peaks by power, strongest first.
    pub frequency_distribution: Vec<FrequencyPeak>,
}

/// How closely the log-log spectrum follows a 1/f slope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PinkNoiseQuality {
    /// max(0, 1 − |slope − (−1)|), in [0, 1].
    pub pink_noise_quality: f64,
    pub spectral_slope: f64,
    pub slope_deviation: f64,
}

/// Heuristic chaos proxies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChaosMetrics {
    /// Mean natural log of adjacent absolute differences.
    pub lyapunov_estimate: f64,
    /// Shannon entropy (nats) of a 10-bin histogram.
    pub entropy: f64,
    /// 1 + min(1, std), in [1, 2].
    pub fractal_dimension: f64,
}

/// Entropy source information attached when a quality snapshot is supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntropyAttachment {
    pub secure_entropy_contribution: f64,
    pub entropy_source: String,
    pub security_level: String,
}

impl EntropyAttachment {
    fn from_quality(q: &EntropyQuality) -> Self {
        Self {
            secure_entropy_contribution: finite_or_zero(q.success_rate),
            entropy_source: q.entropy_source.clone(),
            security_level: "high".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsufficientMetrics {
    pub count: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMetrics {
    #[serde(flatten)]
    pub statistics: BufferStatistics,
    #[serde(flatten)]
    pub stability: StabilityMetrics,
    pub warning: String,
    #[serde(flatten)]
    pub entropy: Option<EntropyAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntermediateMetrics {
    #[serde(flatten)]
    pub statistics: BufferStatistics,
    #[serde(flatten)]
    pub stability: StabilityMetrics,
    #[serde(flatten)]
    pub autocorrelation: AutocorrelationMetrics,
    pub warning: String,
    #[serde(flatten)]
    pub entropy: Option<EntropyAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullMetrics {
    #[serde(flatten)]
    pub statistics: BufferStatistics,
    #[serde(flatten)]
    pub stability: StabilityMetrics,
    #[serde(flatten)]
    pub autocorrelation: AutocorrelationMetrics,
    #[serde(flatten)]
    pub spectral: SpectralMetrics,
    #[serde(flatten)]
    pub pink_noise: PinkNoiseQuality,
    #[serde(flatten)]
    pub chaos: ChaosMetrics,
    #[serde(flatten)]
    pub entropy: Option<EntropyAttachment>,
}

/// Metrics result, one variant per data level.
///
/// Serializes as a flat JSON object with a `data_level` tag. Keys below a
/// tier's threshold are absent, never null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "data_level", rename_all = "snake_case")]
pub enum OscillationMetrics {
    Insufficient(InsufficientMetrics),
    Basic(BasicMetrics),
    Intermediate(IntermediateMetrics),
    Full(FullMetrics),
}

impl OscillationMetrics {
    pub fn data_level(&self) -> DataLevel {
        match self {
            Self::Insufficient(_) => DataLevel::Insufficient,
            Self::Basic(_) => DataLevel::Basic,
            Self::Intermediate(_) => DataLevel::Intermediate,
            Self::Full(_) => DataLevel::Full,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Self::Insufficient(m) => m.count,
            _ => self.statistics().map(|s| s.count).unwrap_or(0),
        }
    }

    pub fn statistics(&self) -> Option<&BufferStatistics> {
        match self {
            Self::Insufficient(_) => None,
            Self::Basic(m) => Some(&m.statistics),
            Self::Intermediate(m) => Some(&m.statistics),
            Self::Full(m) => Some(&m.statistics),
        }
    }

    pub fn stability(&self) -> Option<&StabilityMetrics> {
        match self {
            Self::Insufficient(_) => None,
            Self::Basic(m) => Some(&m.stability),
            Self::Intermediate(m) => Some(&m.stability),
            Self::Full(m) => Some(&m.stability),
        }
    }

    pub fn autocorrelation(&self) -> Option<&AutocorrelationMetrics> {
        match self {
            Self::Intermediate(m) => Some(&m.autocorrelation),
            Self::Full(m) => Some(&m.autocorrelation),
            _ => None,
        }
    }

    pub fn spectral(&self) -> Option<&SpectralMetrics> {
        match self {
            Self::Full(m) => Some(&m.spectral),
            _ => None,
        }
    }

    pub fn pink_noise(&self) -> Option<&PinkNoiseQuality> {
        match self {
            Self::Full(m) => Some(&m.pink_noise),
            _ => None,
        }
    }

    pub fn chaos(&self) -> Option<&ChaosMetrics> {
        match self {
            Self::Full(m) => Some(&m.chaos),
            _ => None,
        }
    }

    pub fn dominant_frequency(&self) -> Option<f64> {
        self.spectral().map(|s| s.dominant_frequency)
    }

    pub fn entropy(&self) -> Option<&EntropyAttachment> {
        match self {
            Self::Insufficient(_) => None,
            Self::Basic(m) => m.entropy.as_ref(),
            Self::Intermediate(m) => m.entropy.as_ref(),
            Self::Full(m) => m.entropy.as_ref(),
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Basic(m) => Some(&m.warning),
            Self::Intermediate(m) => Some(&m.warning),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Insufficient(m) => Some(&m.error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compute the metrics tier appropriate for `values`.
///
/// Non-finite inputs are treated as 0.0.
pub fn compute_metrics(values: &[f64], quality: Option<&EntropyQuality>) -> OscillationMetrics {
    let values: Vec<f64> = values.iter().copied().map(finite_or_zero).collect();
    let n = values.len();
    let level = DataLevel::for_count(n);

    if level == DataLevel::Insufficient {
        return OscillationMetrics::Insufficient(InsufficientMetrics {
            count: n,
            error: "Insufficient data".to_string(),
        });
    }

    let statistics = BufferStatistics::from_values(&values);
    let stability = stability_metrics(&values, statistics.variance);
    let entropy = quality.map(EntropyAttachment::from_quality);
    let warning = format!("Limited data ({n} samples) - results may be less accurate");

    match level {
        DataLevel::Basic => OscillationMetrics::Basic(BasicMetrics {
            statistics,
            stability,
            warning,
            entropy,
        }),
        DataLevel::Intermediate => OscillationMetrics::Intermediate(IntermediateMetrics {
            statistics,
            stability,
            autocorrelation: autocorrelation_metrics(&values),
            warning,
            entropy,
        }),
        _ => {
            let spectrum = positive_spectrum(&values);
            OscillationMetrics::Full(FullMetrics {
                statistics,
                stability,
                autocorrelation: autocorrelation_metrics(&values),
                spectral: spectral_metrics(&spectrum),
                pink_noise: pink_noise_quality(&spectrum),
                chaos: chaos_metrics(&values, statistics.std),
                entropy,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis functions
// ---------------------------------------------------------------------------

/// Pearson correlation between `values[..n-lag]` and `values[lag..]`.
/// Returns 0.0 when undefined (too short, or a constant segment).
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag >= values.len() {
        return 0.0;
    }
    let n = values.len();
    pearson_correlation(&values[..n - lag], &values[lag..])
}

fn stability_metrics(values: &[f64], variance: f64) -> StabilityMetrics {
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let volatility = BufferStatistics::from_values(&diffs).std;
    let index: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    StabilityMetrics {
        stability: finite_or_zero(1.0 / (1.0 + variance * 10.0)),
        volatility: finite_or_zero(volatility),
        trend: linear_slope(&index, values),
    }
}

fn autocorrelation_metrics(values: &[f64]) -> AutocorrelationMetrics {
    let max_lag = MAX_AUTOCORR_LAG.min(values.len() / 2);
    let autocorrelations: Vec<f64> = (1..=max_lag).map(|lag| autocorrelation(values, lag)).collect();
    let first = autocorrelations.first().copied().unwrap_or(0.0);
    AutocorrelationMetrics {
        autocorrelations,
        first_order_autocorr: first,
        randomness_score: 1.0 - first.abs(),
    }
}

/// Power at each strictly positive normalized frequency below 0.5:
/// bins `k / n` for `k = 1..=(n-1)/2`.
fn positive_spectrum(values: &[f64]) -> Vec<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    (1..=(n - 1) / 2)
        .map(|k| (k as f64 / n as f64, finite_or_zero(buffer[k].norm_sqr())))
        .collect()
}

fn spectral_metrics(spectrum: &[(f64, f64)]) -> SpectralMetrics {
    if spectrum.is_empty() {
        return SpectralMetrics {
            dominant_frequency: 0.0,
            spectral_power: 0.0,
            frequency_distribution: Vec::new(),
        };
    }
    let total: f64 = spectrum.iter().map(|&(_, p)| p).sum();

    let mut ranked: Vec<(f64, f64)> = spectrum.to_vec();
    // Stable sort: equal powers keep the lower frequency first.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let frequency_distribution = ranked
        .iter()
        .take(TOP_FREQUENCIES)
        .map(|&(frequency, power)| FrequencyPeak {
            frequency,
            power,
            relative_power: if total > 0.0 {
                finite_or_zero(power / total)
            } else {
                0.0
            },
        })
        .collect();

    SpectralMetrics {
        dominant_frequency: ranked[0].0,
        spectral_power: finite_or_zero(total),
        frequency_distribution,
    }
}

fn pink_noise_quality(spectrum: &[(f64, f64)]) -> PinkNoiseQuality {
    let unfit = PinkNoiseQuality {
        pink_noise_quality: 0.0,
        spectral_slope: 0.0,
        slope_deviation: 1.0,
    };
    if spectrum.len() <= 2 {
        return unfit;
    }
    let (log_f, log_p): (Vec<f64>, Vec<f64>) = spectrum
        .iter()
        .map(|&(f, p)| ((f + LOG_FLOOR).log10(), (p + LOG_FLOOR).log10()))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    if log_f.len() < 2 {
        return unfit;
    }
    let slope = linear_slope(&log_f, &log_p);
    let deviation = (slope - IDEAL_PINK_SLOPE).abs();
    PinkNoiseQuality {
        pink_noise_quality: (1.0 - deviation).clamp(0.0, 1.0),
        spectral_slope: slope,
        slope_deviation: deviation,
    }
}

fn chaos_metrics(values: &[f64], std: f64) -> ChaosMetrics {
    let log_diffs: Vec<f64> = values
        .windows(2)
        .map(|w| {
            let d = (w[1] - w[0]).abs();
            if d > 0.0 { d.ln() } else { LOG_FLOOR.ln() }
        })
        .collect();
    let lyapunov_estimate = if log_diffs.is_empty() {
        0.0
    } else {
        log_diffs.iter().sum::<f64>() / log_diffs.len() as f64
    };

    ChaosMetrics {
        lyapunov_estimate: finite_or_zero(lyapunov_estimate),
        entropy: finite_or_zero(histogram_entropy(values, HISTOGRAM_BINS)),
        fractal_dimension: 1.0 + std.clamp(0.0, 1.0),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pearson correlation coefficient between two equal-length slices.
fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < 1e-300 {
        0.0
    } else {
        finite_or_zero(cov / denom)
    }
}

/// Least-squares slope of `y` against `x`; 0.0 when `x` is constant.
fn linear_slope(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        sxy += (x[i] - mx) * (y[i] - my);
        sxx += (x[i] - mx).powi(2);
    }
    if sxx <= 0.0 {
        0.0
    } else {
        finite_or_zero(sxy / sxx)
    }
}

/// Shannon entropy in nats of an equal-width histogram over [min, max].
/// Empty bins contribute nothing.
fn histogram_entropy(values: &[f64], bins: usize) -> f64 {
    if values.is_empty() || bins == 0 {
        return 0.0;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            bins / 2
        };
        counts[idx] += 1;
    }

    let n = values.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Deterministic noise in [-amp, amp).
    fn lcg_noise(n: usize, seed: u64, amp: f64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) * amp
            })
            .collect()
    }

    fn sample_quality() -> EntropyQuality {
        EntropyQuality {
            entropy_source: "secure_combined".into(),
            success_rate: 0.9,
            successful_calls: 9,
            failed_calls: 1,
            total_entropy_bits: 288,
            buffer_size: 10,
            secure_mode: true,
            system: "linux".into(),
            architecture: "x86_64".into(),
            has_rdrand: false,
            has_rdseed: false,
            entropy_sources: vec!["secrets".into()],
        }
    }

    fn assert_all_finite(json: &serde_json::Value) {
        match json {
            serde_json::Value::Number(n) => assert!(n.as_f64().is_some_and(f64::is_finite)),
            serde_json::Value::Array(a) => a.iter().for_each(assert_all_finite),
            serde_json::Value::Object(o) => o.values().for_each(assert_all_finite),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Tier selection
    // -----------------------------------------------------------------------

    #[test]
    fn test_data_level_thresholds() {
        assert_eq!(DataLevel::for_count(0), DataLevel::Insufficient);
        assert_eq!(DataLevel::for_count(2), DataLevel::Insufficient);
        assert_eq!(DataLevel::for_count(3), DataLevel::Basic);
        assert_eq!(DataLevel::for_count(4), DataLevel::Basic);
        assert_eq!(DataLevel::for_count(5), DataLevel::Intermediate);
        assert_eq!(DataLevel::for_count(9), DataLevel::Intermediate);
        assert_eq!(DataLevel::for_count(10), DataLevel::Full);
    }

    #[test]
    fn test_insufficient() {
        let m = compute_metrics(&[0.1, 0.2], None);
        assert_eq!(m.data_level(), DataLevel::Insufficient);
        assert!(m.error().is_some());
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["data_level"], "insufficient");
        assert_eq!(json["count"], 2);
        assert!(json.get("error").is_some());
        assert!(json.get("mean").is_none());
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_basic() {
        let m = compute_metrics(&[0.1, 0.2, 0.3, 0.4], None);
        assert_eq!(m.data_level(), DataLevel::Basic);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["data_level"], "basic");
        for key in ["mean", "std", "min", "max", "range", "variance", "stability", "volatility", "trend", "warning"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("dominant_frequency").is_none());
        assert!(json.get("autocorrelations").is_none());
        assert!(json.get("security_level").is_none());
        assert!((json["trend"].as_f64().unwrap() - 0.1).abs() < 1e-12);
        assert!(json["volatility"].as_f64().unwrap().abs() < 1e-12);
        assert_eq!(
            m.warning(),
            Some("Limited data (4 samples) - results may be less accurate")
        );
    }

    #[test]
    fn test_intermediate() {
        let values = [0.1, -0.1, 0.1, -0.1, 0.1, -0.1, 0.1];
        let m = compute_metrics(&values, None);
        assert_eq!(m.data_level(), DataLevel::Intermediate);
        let ac = m.autocorrelation().unwrap();
        assert_eq!(ac.autocorrelations.len(), 3);
        assert!((ac.first_order_autocorr + 1.0).abs() < 1e-9);
        assert!(ac.randomness_score.abs() < 1e-9);
        assert!(m.warning().is_some());
        assert!(m.dominant_frequency().is_none());
    }

    #[test]
    fn test_full_keys_present() {
        let values = lcg_noise(32, 7, 0.5);
        let m = compute_metrics(&values, None);
        assert_eq!(m.data_level(), DataLevel::Full);
        let json = serde_json::to_value(&m).unwrap();
        for key in [
            "count",
            "mean",
            "stability",
            "autocorrelations",
            "randomness_score",
            "dominant_frequency",
            "spectral_power",
            "frequency_distribution",
            "pink_noise_quality",
            "spectral_slope",
            "slope_deviation",
            "lyapunov_estimate",
            "entropy",
            "fractal_dimension",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("warning").is_none());
        assert_eq!(json["frequency_distribution"].as_array().unwrap().len(), 5);
    }

    // -----------------------------------------------------------------------
    // Spectral
    // -----------------------------------------------------------------------

    #[test]
    fn test_dominant_frequency_of_sine() {
        // 0.5 Hz sampled at 10 Hz: 0.05 cycles per sample.
        let noise = lcg_noise(100, 42, 0.05);
        let values: Vec<f64> = (0..100)
            .map(|i| {
                let t = i as f64 * 0.1;
                0.3 * (2.0 * PI * 0.5 * t).sin() + noise[i]
            })
            .collect();
        let m = compute_metrics(&values, None);
        assert_eq!(m.data_level(), DataLevel::Full);
        let f = m.dominant_frequency().unwrap();
        assert!((f - 0.05).abs() <= 0.011, "dominant frequency {f}");
        let top = &m.spectral().unwrap().frequency_distribution[0];
        assert_eq!(top.frequency, f);
        assert!(top.relative_power > 0.5);
    }

    #[test]
    fn test_spectrum_excludes_nyquist() {
        let spectrum = positive_spectrum(&lcg_noise(10, 1, 1.0));
        assert_eq!(spectrum.len(), 4);
        assert!(spectrum.iter().all(|&(f, _)| f > 0.0 && f < 0.5));
        let spectrum = positive_spectrum(&lcg_noise(11, 1, 1.0));
        assert_eq!(spectrum.len(), 5);
    }

    #[test]
    fn test_pink_quality_bounds() {
        for seed in 0..20 {
            let m = compute_metrics(&lcg_noise(64, seed, 1.0), None);
            let p = m.pink_noise().unwrap();
            assert!((0.0..=1.0).contains(&p.pink_noise_quality));
            assert!((p.slope_deviation - (p.spectral_slope + 1.0).abs()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_random_walk_is_pinker_than_white() {
        let steps = lcg_noise(256, 3, 0.1);
        let mut walk = Vec::with_capacity(steps.len());
        let mut acc = 0.0;
        for s in &steps {
            acc += s;
            walk.push(acc);
        }
        let white = compute_metrics(&steps, None);
        let brown = compute_metrics(&walk, None);
        let ws = white.pink_noise().unwrap().spectral_slope;
        let bs = brown.pink_noise().unwrap().spectral_slope;
        assert!(bs < ws, "walk slope {bs} should be steeper than white {ws}");
    }

    // -----------------------------------------------------------------------
    // Chaos / stability
    // -----------------------------------------------------------------------

    #[test]
    fn test_constant_signal() {
        let m = compute_metrics(&[0.25; 12], None);
        let s = m.stability().unwrap();
        assert_eq!(s.stability, 1.0);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.trend, 0.0);
        let c = m.chaos().unwrap();
        assert!((c.lyapunov_estimate - 1e-10f64.ln()).abs() < 1e-9);
        assert_eq!(c.entropy, 0.0);
        assert_eq!(c.fractal_dimension, 1.0);
        let ac = m.autocorrelation().unwrap();
        assert!(ac.autocorrelations.iter().all(|&r| r == 0.0));
        assert_eq!(ac.randomness_score, 1.0);
    }

    #[test]
    fn test_histogram_entropy_uniform() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let h = histogram_entropy(&values, 10);
        assert!((h - 10f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_fractal_dimension_capped() {
        let values: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 5.0 } else { -5.0 }).collect();
        let c = *compute_metrics(&values, None).chaos().unwrap();
        assert_eq!(c.fractal_dimension, 2.0);
    }

    #[test]
    fn test_stability_range() {
        for seed in 0..10 {
            let m = compute_metrics(&lcg_noise(20, seed, 3.0), None);
            let s = m.stability().unwrap().stability;
            assert!(s > 0.0 && s <= 1.0);
        }
    }

    // -----------------------------------------------------------------------
    // Entropy attachment / purity / finiteness
    // -----------------------------------------------------------------------

    #[test]
    fn test_entropy_attachment() {
        let q = sample_quality();
        let m = compute_metrics(&lcg_noise(6, 5, 0.2), Some(&q));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["security_level"], "high");
        assert_eq!(json["entropy_source"], "secure_combined");
        assert!((json["secure_entropy_contribution"].as_f64().unwrap() - 0.9).abs() < 1e-12);

        let m = compute_metrics(&[1.0], Some(&q));
        assert!(m.entropy().is_none());
    }

    #[test]
    fn test_pure_function() {
        let values = lcg_noise(50, 11, 0.4);
        let q = sample_quality();
        let a = serde_json::to_value(compute_metrics(&values, Some(&q))).unwrap();
        let b = serde_json::to_value(compute_metrics(&values, Some(&q))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_finite_inputs_coerced() {
        let mut values = lcg_noise(30, 9, 0.3);
        values[3] = f64::NAN;
        values[7] = f64::INFINITY;
        values[11] = f64::NEG_INFINITY;
        let m = compute_metrics(&values, None);
        assert_all_finite(&serde_json::to_value(&m).unwrap());
        let m = compute_metrics(&[f64::MAX, -f64::MAX, f64::MAX, -f64::MAX, f64::MAX], None);
        assert_all_finite(&serde_json::to_value(&m).unwrap());
    }

    #[test]
    fn test_autocorrelation_helper() {
        assert_eq!(autocorrelation(&[1.0, 2.0], 0), 0.0);
        assert_eq!(autocorrelation(&[1.0, 2.0], 5), 0.0);
        let ramp: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!((autocorrelation(&ramp, 3) - 1.0).abs() < 1e-12);
    }
}
