//! Generator-backed inputs: the thread-local CSPRNG and the OS random device.

use rand::RngCore;

use crate::error::EntropyError;
use crate::source::{EntropyInput, InputCategory, InputInfo};

static CSPRNG_INFO: InputInfo = InputInfo {
    name: "secrets",
    description: "Thread-local cryptographically secure generator (rand::rng)",
    category: InputCategory::Csprng,
    rotation: 0,
};

static OS_INFO: InputInfo = InputInfo {
    name: "os_urandom",
    description: "Operating system random device via getrandom",
    category: InputCategory::Os,
    rotation: 0,
};

/// Draws from `rand`'s thread-local CSPRNG.
#[derive(Debug, Default)]
pub struct CsprngInput;

impl EntropyInput for CsprngInput {
    fn info(&self) -> &InputInfo {
        &CSPRNG_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let mut buf = vec![0u8; n_bytes];
        rand::rng().fill_bytes(&mut buf);
        Ok(buf)
    }
}

/// Draws straight from the OS random device.
#[derive(Debug, Default)]
pub struct OsInput;

impl EntropyInput for OsInput {
    fn info(&self) -> &InputInfo {
        &OS_INFO
    }

    fn is_available(&self) -> bool {
        let mut probe = [0u8; 1];
        getrandom::fill(&mut probe).is_ok()
    }

    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let mut buf = vec![0u8; n_bytes];
        getrandom::fill(&mut buf).map_err(EntropyError::Os)?;
        Ok(buf)
    }
}
