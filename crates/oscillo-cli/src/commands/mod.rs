pub mod entropy;
pub mod metrics;
pub mod pink;
pub mod simulate;

use std::path::Path;

use oscillo_core::OscillationSnapshot;
use serde::Serialize;

/// Print `value` as pretty JSON, or write it to `path` when given.
pub fn write_json<T: Serialize>(value: &T, path: Option<&str>, label: &str) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to encode {label}: {e}");
            std::process::exit(1);
        }
    };
    match path {
        Some(p) => match std::fs::write(p, json) {
            Ok(()) => println!("{label} written to {p}"),
            Err(e) => {
                eprintln!("Failed to write {p}: {e}");
                std::process::exit(1);
            }
        },
        None => println!("{json}"),
    }
}

/// Read a buffer snapshot from a JSON file.
pub fn read_snapshot(path: &Path) -> Result<OscillationSnapshot, String> {
    let data = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("{}: not a snapshot: {e}", path.display()))
}
