//! Apple Silicon probing via `sysctl` and `pmset`.
//!
//! Apple exposes no VRAM concept — GPU and CPU share unified memory — so
//! this probe reports total system memory and the chip model; the caller
//! derives `effective_vram_gb` from `HardwareProfile::build`.

use std::time::Duration;

use crate::command::{first_number, CommandRunner};

use super::tables::apple_chip_bandwidth_gbps;
use super::{GpuInfo, GpuVendor, ThermalState};

pub struct AppleReading {
    pub chip_name: String,
    pub total_ram_gb: f32,
}

/// Read total unified memory and the chip model string. Returns `None` on
/// non-Apple-Silicon hosts or when `sysctl` is unavailable.
#[cfg(target_os = "macos")]
pub fn probe(runner: &dyn CommandRunner, timeout: Duration) -> Option<AppleReading> {
    let mem_bytes_text = runner.run("sysctl", &["-n", "hw.memsize"], timeout)?;
    let mem_bytes = first_number("sysctl hw.memsize", &mem_bytes_text).ok()?;
    let chip_name = runner
        .run("sysctl", &["-n", "machdep.cpu.brand_string"], timeout)?
        .trim()
        .to_string();

    if !chip_name.contains("Apple") {
        return None;
    }

    Some(AppleReading {
        chip_name,
        total_ram_gb: (mem_bytes / 1024.0 / 1024.0 / 1024.0) as f32,
    })
}

#[cfg(not(target_os = "macos"))]
pub fn probe(_runner: &dyn CommandRunner, _timeout: Duration) -> Option<AppleReading> {
    None
}

/// Build the normalized [`GpuInfo`] for an Apple Silicon reading, resolving
/// unified-memory bandwidth from the chip→bandwidth table. Returns a
/// recorded-warning flag when the chip is unrecognized so the orchestrator
/// can attach a `ProbeWarning` rather than silently defaulting.
pub fn to_gpu_info(reading: &AppleReading) -> (GpuInfo, bool /* bandwidth_was_default */) {
    let (bandwidth, used_default) = match apple_chip_bandwidth_gbps(&reading.chip_name) {
        Some(bw) => (bw, false),
        None => (crate::defaults::APPLE_UNKNOWN_CHIP_BANDWIDTH_GBPS, true),
    };

    let gpu = GpuInfo {
        vendor: GpuVendor::Apple,
        name: reading.chip_name.clone(),
        vram_gb: 0.0, // unified memory: effective_vram_gb is derived from ram.total_gb
        memory_bandwidth_gbps: bandwidth,
        compute_capability: None,
        supports_fp8: false,
        supports_bf16: true,
        supports_fp4: false,
        flash_attention: false,
        unified_memory: true,
    };

    (gpu, used_default)
}

/// Parse the macOS thermal pressure advisory (`pmset -g therm` or the
/// `NSProcessInfo` thermal state string) into a [`ThermalState`].
pub fn parse_thermal_state(advisory: &str) -> ThermalState {
    let lower = advisory.to_lowercase();
    if lower.contains("critical") {
        ThermalState::Critical
    } else if lower.contains("serious") || lower.contains("heavy") {
        ThermalState::Serious
    } else if lower.contains("fair") || lower.contains("moderate") {
        ThermalState::Fair
    } else {
        ThermalState::Nominal
    }
}

#[cfg(target_os = "macos")]
pub fn probe_thermal_state(runner: &dyn CommandRunner, timeout: Duration) -> ThermalState {
    runner
        .run("pmset", &["-g", "therm"], timeout)
        .map(|s| parse_thermal_state(&s))
        .unwrap_or(ThermalState::Nominal)
}

#[cfg(not(target_os = "macos"))]
pub fn probe_thermal_state(_runner: &dyn CommandRunner, _timeout: Duration) -> ThermalState {
    ThermalState::Nominal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chip_resolves_bandwidth_without_default_flag() {
        let reading = AppleReading {
            chip_name: "Apple M3 Max".into(),
            total_ram_gb: 48.0,
        };
        let (gpu, used_default) = to_gpu_info(&reading);
        assert_eq!(gpu.memory_bandwidth_gbps, 400.0);
        assert!(!used_default);
        assert!(gpu.unified_memory);
        assert!(!gpu.supports_fp8);
        assert!(!gpu.flash_attention);
    }

    #[test]
    fn unknown_chip_falls_back_with_default_flag_set() {
        let reading = AppleReading {
            chip_name: "Apple M9 Hypothetical".into(),
            total_ram_gb: 16.0,
        };
        let (gpu, used_default) = to_gpu_info(&reading);
        assert_eq!(
            gpu.memory_bandwidth_gbps,
            crate::defaults::APPLE_UNKNOWN_CHIP_BANDWIDTH_GBPS
        );
        assert!(used_default);
    }

    #[test]
    fn thermal_advisory_parsing() {
        assert_eq!(parse_thermal_state("No thermal pressure"), ThermalState::Nominal);
        assert_eq!(
            parse_thermal_state("CPU_Scheduler_Limit fair"),
            ThermalState::Fair
        );
        assert_eq!(
            parse_thermal_state("thermal pressure: serious"),
            ThermalState::Serious
        );
        assert_eq!(
            parse_thermal_state("thermal state critical"),
            ThermalState::Critical
        );
    }
}
