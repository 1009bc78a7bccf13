//! Built-in raw entropy inputs.

pub mod helpers;

pub mod memory;
pub mod os;
pub mod process;
pub mod timing;

use crate::source::EntropyInput;

/// All built-in input constructors, in mixing order.
pub fn default_inputs() -> Vec<Box<dyn EntropyInput>> {
    vec![
        Box::new(os::CsprngInput),
        Box::new(os::OsInput),
        Box::new(timing::ClockInput),
        Box::new(memory::AddressInput),
        Box::new(process::ProcessInput),
    ]
}

/// Inputs from [`default_inputs`] that can run on this machine.
pub fn detect_available_inputs() -> Vec<Box<dyn EntropyInput>> {
    default_inputs()
        .into_iter()
        .filter(|s| s.is_available())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inputs_names_and_rotations() {
        let inputs = default_inputs();
        let names: Vec<&str> = inputs.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["secrets", "os_urandom", "time_ns", "memory_hash", "process_hash"]
        );
        let rotations: Vec<u32> = inputs.iter().map(|s| s.info().rotation).collect();
        assert_eq!(rotations, [0, 0, 8, 16, 24]);
    }

    #[test]
    fn all_inputs_available_here() {
        assert_eq!(detect_available_inputs().len(), default_inputs().len());
    }
}
