//! Address-space input: hashes the address of a fresh heap allocation.

use crate::error::EntropyError;
use crate::source::{EntropyInput, InputCategory, InputInfo};

use super::helpers::{hash_to_width, mach_time};

static ADDRESS_INFO: InputInfo = InputInfo {
    name: "memory_hash",
    description: "SHA-256 of an ephemeral heap allocation's address",
    category: InputCategory::Memory,
    rotation: 16,
};

/// Hash of an ephemeral memory address. ASLR and allocator state make the
/// address vary between processes and, to a lesser degree, between calls.
#[derive(Debug, Default)]
pub struct AddressInput;

impl EntropyInput for AddressInput {
    fn info(&self) -> &InputInfo {
        &ADDRESS_INFO
    }

    fn is_available(&self) -> bool {
        true
    }

    fn draw(&mut self, n_bytes: usize) -> Result<Vec<u8>, EntropyError> {
        let probe = Box::new(mach_time());
        let addr = std::ptr::from_ref::<u64>(&*probe) as usize;
        let mut material = Vec::with_capacity(16);
        material.extend_from_slice(&addr.to_le_bytes());
        material.extend_from_slice(&probe.to_le_bytes());
        Ok(hash_to_width(&material, n_bytes))
    }
}
