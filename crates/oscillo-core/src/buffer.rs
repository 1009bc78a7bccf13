//! Bounded, time-ordered history of a scalar signal.
//!
//! The buffer holds at most `capacity` samples and evicts the oldest first.
//! Summary statistics are cached for one second and the cache is dropped by
//! every mutation.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::{OscillationError, Result};
use crate::metrics::finite_or_zero;
use crate::timestamp::{format_iso8601, parse_iso8601, seconds_between};

/// How long a computed [`BufferStatistics`] stays valid.
const STATS_CACHE_TTL: Duration = Duration::from_secs(1);

/// One point of the signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillationSample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Population statistics over the buffer's values. All zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BufferStatistics {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub variance: f64,
}

impl BufferStatistics {
    /// Statistics over an arbitrary slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = finite_or_zero(values.iter().population_variance());
        Self {
            count: values.len(),
            mean: finite_or_zero(values.iter().mean()),
            std: variance.sqrt(),
            min: finite_or_zero(min),
            max: finite_or_zero(max),
            range: finite_or_zero(max - min),
            variance,
        }
    }
}

/// Store-ready form of a buffer: finite values and ISO-8601 timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OscillationSnapshot {
    pub values: Vec<f64>,
    pub timestamps: Vec<String>,
}

impl OscillationSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fixed-capacity FIFO of [`OscillationSample`]s.
#[derive(Debug, Clone)]
pub struct OscillationBuffer {
    capacity: usize,
    samples: VecDeque<OscillationSample>,
    stats_cache: Cell<Option<(BufferStatistics, Instant)>>,
}

impl OscillationBuffer {
    /// Empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.min(4096)),
            stats_cache: Cell::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    fn invalidate(&self) {
        self.stats_cache.set(None);
    }

    fn push(&mut self, value: f64, timestamp: DateTime<Utc>) {
        self.samples.push_back(OscillationSample {
            value: finite_or_zero(value),
            timestamp,
        });
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Append one value, timestamped now when `timestamp` is `None`.
    ///
    /// Non-finite values are stored as 0.0.
    pub fn add(&mut self, value: f64, timestamp: Option<DateTime<Utc>>) {
        self.push(value, timestamp.unwrap_or_else(Utc::now));
        self.invalidate();
    }

    /// Append many values. Without timestamps every value gets the same "now".
    pub fn add_many(&mut self, values: &[f64], timestamps: Option<&[DateTime<Utc>]>) -> Result<()> {
        match timestamps {
            Some(ts) if ts.len() != values.len() => {
                return Err(OscillationError::shape_mismatch(values.len(), ts.len()));
            }
            Some(ts) => {
                for (&v, &t) in values.iter().zip(ts) {
                    self.push(v, t);
                }
            }
            None => {
                let now = Utc::now();
                for &v in values {
                    self.push(v, now);
                }
            }
        }
        self.invalidate();
        Ok(())
    }

    pub fn samples(&self) -> impl Iterator<Item = &OscillationSample> {
        self.samples.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    /// The `n` most recent values, oldest first.
    pub fn get_recent(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).map(|s| s.value).collect()
    }

    /// The `n` most recent samples as `(timestamp, value)`, oldest first.
    pub fn recent_with_timestamps(&self, n: usize) -> Vec<(DateTime<Utc>, f64)> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples
            .iter()
            .skip(skip)
            .map(|s| (s.timestamp, s.value))
            .collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.invalidate();
    }

    /// Statistics over all values, served from cache for up to one second.
    pub fn get_statistics(&self) -> BufferStatistics {
        if let Some((stats, at)) = self.stats_cache.get() {
            if at.elapsed() < STATS_CACHE_TTL {
                return stats;
            }
        }
        let stats = BufferStatistics::from_values(&self.values());
        self.stats_cache.set(Some((stats, Instant::now())));
        stats
    }

    /// First and last timestamps in buffer order.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Seconds between the first and last timestamps.
    pub fn duration_secs(&self) -> f64 {
        self.time_range()
            .map(|(a, b)| seconds_between(&a, &b))
            .unwrap_or(0.0)
    }

    /// Linear interpolation over the index domain to exactly `target_size`
    /// points. The first and last values are always kept.
    pub fn resample(&self, target_size: usize) -> Vec<f64> {
        let values = self.values();
        let n = values.len();
        if n == 0 || target_size == 0 {
            return Vec::new();
        }
        if n == target_size {
            return values;
        }
        let last = (n - 1) as f64;
        (0..target_size)
            .map(|i| {
                let x = if target_size == 1 {
                    0.0
                } else {
                    i as f64 * last / (target_size - 1) as f64
                };
                let lo = (x.floor() as usize).min(n - 1);
                let hi = (lo + 1).min(n - 1);
                let frac = x - lo as f64;
                values[lo] + (values[hi] - values[lo]) * frac
            })
            .collect()
    }

    /// Finite differences over elapsed seconds for each adjacent pair.
    /// A pair with no elapsed time (or time running backwards) yields 0.0.
    pub fn get_derivative(&self) -> Vec<f64> {
        let samples: Vec<&OscillationSample> = self.samples.iter().collect();
        samples
            .windows(2)
            .map(|w| {
                let dt = seconds_between(&w[0].timestamp, &w[1].timestamp);
                if dt > 0.0 {
                    finite_or_zero((w[1].value - w[0].value) / dt)
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Stable sort by timestamp; equal timestamps keep insertion order.
    pub fn sort_by_timestamp(&mut self) {
        self.samples
            .make_contiguous()
            .sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.invalidate();
    }

    /// Drop the oldest samples until at most `cap` remain.
    pub fn truncate_front_to(&mut self, cap: usize) {
        while self.samples.len() > cap {
            self.samples.pop_front();
        }
        self.invalidate();
    }

    /// Store-ready snapshot.
    pub fn to_snapshot(&self) -> OscillationSnapshot {
        OscillationSnapshot {
            values: self.samples.iter().map(|s| finite_or_zero(s.value)).collect(),
            timestamps: self
                .samples
                .iter()
                .map(|s| format_iso8601(&s.timestamp))
                .collect(),
        }
    }

    /// Rebuild a buffer from a snapshot. Samples beyond `capacity` are evicted
    /// oldest first.
    pub fn from_snapshot(snapshot: &OscillationSnapshot, capacity: usize) -> Result<Self> {
        if snapshot.values.len() != snapshot.timestamps.len() {
            return Err(OscillationError::shape_mismatch(
                snapshot.values.len(),
                snapshot.timestamps.len(),
            ));
        }
        let timestamps = snapshot
            .timestamps
            .iter()
            .map(|s| parse_iso8601(s))
            .collect::<Result<Vec<_>>>()?;
        let mut buffer = Self::new(capacity);
        buffer.add_many(&snapshot.values, Some(&timestamps))?;
        Ok(buffer)
    }
}
