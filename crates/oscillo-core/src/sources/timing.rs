//! Clock-derived input and the last-resort time scrambler.

use crate::conditioning::{u128_from_le, width_mask};
use crate::error::EntropyError;
use crate::source::{EntropyInput, InputCategory, InputInfo};

use super::helpers::{hash_to_width, mach_time, nanos_since_epoch};

static CLOCK_INFO: InputInfo = InputInfo {
    name: "time_ns",
    description: "SHA-256 of wall-clock nanoseconds and the monotonic counter",
    category: InputCategory::Timing,
    rotation: 8,
};

/// Hash of a high-resolution timestamp.
#[derive(Debug, Default)]
pub struct ClockInput;

impl EntropyInput for ClockInput {
    fn info(&self) -> &InputInfo {
        &CLOCK_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let mut material = Vec::with_capacity(24);
        material.extend_from_slice(&nanos_since_epoch().to_le_bytes());
        material.extend_from_slice(&mach_time().to_le_bytes());
        Ok(hash_to_width(&material, n_bytes))
    }
}

/// Last-resort draw when every generator has failed: wall-clock nanoseconds
/// XOR a hash of the process id, masked to the draw width.
///
/// Predictable. Only used so callers always receive a value.
pub fn time_scramble(n_bytes: usize) -> u128 {
    let pid = std::process::id();
    let pid_hash = u128_from_le(&hash_to_width(&pid.to_le_bytes(), 16), 16);
    (nanos_since_epoch() ^ pid_hash) & width_mask(n_bytes)
}
