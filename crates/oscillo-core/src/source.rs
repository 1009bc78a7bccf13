//! Raw entropy input trait and runtime state.
//!
//! Every raw randomness input implements the [`EntropyInput`] trait, which
//! provides metadata via [`InputInfo`], availability checking, and raw byte
//! draws. [`crate::entropy::EntropySource`] mixes the inputs together.

use crate::error::EntropyError;

/// Category of entropy input based on where its unpredictability comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCategory {
    /// User-space cryptographic generator.
    Csprng,
    /// Operating system random device.
    Os,
    /// Clock and scheduling jitter.
    Timing,
    /// Allocator and address-space layout.
    Memory,
    /// Process identity and accounting.
    Process,
}

impl std::fmt::Display for InputCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csprng => write!(f, "csprng"),
            Self::Os => write!(f, "os"),
            Self::Timing => write!(f, "timing"),
            Self::Memory => write!(f, "memory"),
            Self::Process => write!(f, "process"),
        }
    }
}

/// Metadata about an entropy input.
#[derive(Debug, Clone)]
pub struct InputInfo {
    /// Unique identifier (e.g. `"os_urandom"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Input category for classification.
    pub category: InputCategory,
    /// Left rotation, in bits, applied to this input's draw before mixing.
    pub rotation: u32,
}

/// Trait that every entropy input must implement.
pub trait EntropyInput: Send {
    /// Input metadata.
    fn info(&self) -> &InputInfo;

    /// Check if this input can operate on the current machine.
    fn is_available(&self) -> bool;

    /// Draw exactly `n_bytes` raw bytes.
    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Runtime state for an input registered with an entropy source.
pub struct InputState {
    pub input: Box<dyn EntropyInput>,
    pub total_bytes: u64,
    pub failures: u64,
    pub healthy: bool,
}

impl InputState {
    pub fn new(input: Box<dyn EntropyInput>) -> Self {
        Self {
            input,
            total_bytes: 0,
            failures: 0,
            healthy: true,
        }
    }

    /// Draw from the wrapped input, checking the length and updating counters.
    pub fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let result = self.input.draw(n_bytes).and_then(|bytes| {
            if bytes.len() < n_bytes {
                Err(EntropyError::ShortRead {
                    input: self.input.name(),
                    expected: n_bytes,
                    actual: bytes.len(),
                })
            } else {
                Ok(bytes)
            }
        });
        match &result {
            Ok(bytes) => {
                self.total_bytes += bytes.len() as u64;
                self.healthy = true;
            }
            Err(_) => {
                self.failures += 1;
                self.healthy = false;
            }
        }
        result
    }
}
