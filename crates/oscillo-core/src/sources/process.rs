//! ProcessInput: hashes the process id together with consumed CPU time.
//!
//! The pid is fixed for the life of the process; the CPU-time reading moves
//! with every draw and carries the scheduling jitter.

use crate::error::EntropyError;
use crate::source::{EntropyInput, InputCategory, InputInfo};

use super::helpers::{hash_to_width, process_cpu_nanos};

static PROCESS_INFO: InputInfo = InputInfo {
    name: "process_hash",
    description: "SHA-256 of the process id and process CPU time",
    category: InputCategory::Process,
    rotation: 24,
};

#[derive(Debug, Default)]
pub struct ProcessInput;

impl EntropyInput for ProcessInput {
    fn info(&self) -> &InputInfo {
        &PROCESS_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let pid = u64::from(std::process::id());
        let mixed = pid.wrapping_add(process_cpu_nanos());
        let mut material = Vec::with_capacity(16);
        material.extend_from_slice(&mixed.to_le_bytes());
        material.extend_from_slice(&pid.to_le_bytes());
        Ok(hash_to_width(&material, n_bytes))
    }
}
