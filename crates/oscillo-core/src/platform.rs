//! Platform detection.
//!
//! CPU feature flags are recorded for reporting only. Nothing in the crate
//! branches on them.

use log::info;
use serde::Serialize;

/// Platform information.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub system: String,
    pub machine: String,
    pub family: String,
    /// CPU advertises RDRAND (informational).
    pub has_rdrand: bool,
    /// CPU advertises RDSEED (informational).
    pub has_rdseed: bool,
}

/// Detect the current platform.
pub fn platform_info() -> PlatformInfo {
    let (has_rdrand, has_rdseed) = detect_cpu_features();
    PlatformInfo {
        system: std::env::consts::OS.to_string(),
        machine: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
        has_rdrand,
        has_rdseed,
    }
}

/// Read RDRAND/RDSEED flags without spawning processes.
fn detect_cpu_features() -> (bool, bool) {
    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        match std::fs::read_to_string("/proc/cpuinfo") {
            Ok(s) => {
                let flags = cpu_flags_from_cpuinfo(&s);
                info!(
                    "CPU features (informational only): RDRAND={} RDSEED={}",
                    flags.0, flags.1
                );
                flags
            }
            Err(e) => {
                log::debug!("cpuinfo unreadable: {e}");
                (false, false)
            }
        }
    }
    #[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
    {
        info!("CPU feature detection unsupported on this OS");
        (false, false)
    }
}

fn cpu_flags_from_cpuinfo(cpuinfo: &str) -> (bool, bool) {
    let flags = cpuinfo
        .lines()
        .find(|l| l.starts_with("flags") || l.starts_with("Features"))
        .map(|l| l.to_ascii_lowercase())
        .unwrap_or_default();
    let has = |name: &str| flags.split_whitespace().any(|f| f == name);
    (has("rdrand"), has("rdseed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_info_populated() {
        let p = platform_info();
        assert!(!p.system.is_empty());
        assert!(!p.machine.is_empty());
    }

    #[test]
    fn test_cpu_flags_from_cpuinfo() {
        let text = "processor\t: 0\nflags\t\t: fpu sse2 rdrand rdseed avx\n";
        assert_eq!(cpu_flags_from_cpuinfo(text), (true, true));
        let text = "flags\t\t: fpu sse2 avx\n";
        assert_eq!(cpu_flags_from_cpuinfo(text), (false, false));
        assert_eq!(cpu_flags_from_cpuinfo(""), (false, false));
    }
}
