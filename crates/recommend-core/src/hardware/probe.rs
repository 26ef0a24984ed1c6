//! Top-level hardware detection: platform dispatch and warning collection.
//!
//! Dispatch order is NVIDIA -> AMD -> Apple Silicon -> CPU-only, matching
//! the priority a desktop configurator cares about (a discrete accelerator
//! always wins over unified memory, which always wins over CPU-only). Each
//! vendor probe is independently best-effort: a failure there becomes a
//! [`ProbeWarning`] and the dispatch falls through to the next vendor, down
//! to a CPU-only platform if none respond. The run only fails fatally when
//! RAM itself cannot be read, since every downstream layer needs at least
//! one capacity figure to operate on.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::warn;

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::defaults::PROBE_TIMEOUT_SECS_DEFAULT;
use crate::error::{Error, Result};

use super::{
    amd, apple, cpu_ram_storage, nvidia, tables, FormFactor, GpuInfo, GpuVendor, HardwareProfile,
    Platform, PowerState, RamType, ThermalState,
};

/// A non-fatal probe failure or fallback-default use, recorded instead of
/// silently swallowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeWarning {
    pub field: String,
    pub message: String,
}

impl ProbeWarning {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Detect the local hardware profile using real subprocesses and the
/// default probe timeout.
pub fn detect() -> Result<HardwareProfile> {
    detect_with_runner(
        &SystemCommandRunner,
        Duration::from_secs(PROBE_TIMEOUT_SECS_DEFAULT),
    )
}

/// Detect the local hardware profile using an injected [`CommandRunner`],
/// so callers (principally tests) can stub subprocess output.
pub fn detect_with_runner(
    runner: &dyn CommandRunner,
    timeout: Duration,
) -> Result<HardwareProfile> {
    let mut warnings = Vec::new();

    let (platform, gpu, form_factor) = detect_gpu_subsystem(runner, timeout, &mut warnings);

    let mut sys = System::new();
    sys.refresh_cpu_all();
    sys.refresh_memory();
    let cpu = cpu_ram_storage::detect_cpu(&sys);
    let mut ram = cpu_ram_storage::detect_ram(&sys);

    if platform.is_apple_silicon() {
        ram.ram_type = RamType::Unified;
    }

    if ram.total_gb <= 0.0 {
        return Err(Error::ProbeFailed {
            field: "ram.total_gb".into(),
            cause: "sysinfo reported zero total memory; no capacity figure could be established"
                .into(),
        });
    }

    let storage = cpu_ram_storage::detect_storage(&current_volume_path()).unwrap_or_else(|| {
        warnings.push(ProbeWarning::new(
            "storage",
            "no disk information available for the install path; using conservative defaults",
        ));
        super::StorageInfo {
            free_gb: 0.0,
            total_gb: 0.0,
            storage_type: super::StorageType::Unknown,
            tier: super::StorageTier::Moderate,
            read_mbps: tables::storage_read_mbps_for_tier(super::StorageTier::Moderate),
        }
    });

    let thermal_state = if platform.is_apple_silicon() {
        apple::probe_thermal_state(runner, timeout)
    } else {
        ThermalState::Nominal
    };

    let power_state = detect_power_state();

    for warning in &warnings {
        warn!(
            probe_field = %warning.field,
            error_msg = %warning.message,
            "hardware probe warning"
        );
    }

    HardwareProfile::build(
        platform,
        gpu,
        cpu,
        ram,
        storage,
        form_factor,
        thermal_state,
        power_state,
        warnings,
    )
}

fn detect_gpu_subsystem(
    runner: &dyn CommandRunner,
    timeout: Duration,
    warnings: &mut Vec<ProbeWarning>,
) -> (Platform, GpuInfo, FormFactor) {
    if let Some(reading) = nvidia::probe(runner, timeout) {
        match nvidia::to_profile_facts(reading) {
            Ok((gpu, form_factor, is_laptop, bandwidth_used_default)) => {
                if bandwidth_used_default {
                    warnings.push(ProbeWarning::new(
                        "gpu.memory_bandwidth_gbps",
                        format!(
                            "no bandwidth table entry for '{}'; using conservative default",
                            gpu.name
                        ),
                    ));
                }
                if is_laptop && tables::nvidia_reference_tdp_watts(&gpu.name).is_none() {
                    warnings.push(ProbeWarning::new(
                        "form_factor.sustained_performance_ratio",
                        format!("no reference TDP entry for '{}'; laptop ratio clamped to the minimum", gpu.name),
                    ));
                }
                let platform = if is_laptop {
                    Platform::NvidiaLaptop
                } else {
                    Platform::NvidiaDesktop
                };
                return (platform, gpu, form_factor);
            }
            Err(e) => warnings.push(ProbeWarning::new("gpu", e.to_string())),
        }
    }

    if let Some(reading) = amd::probe(runner, timeout) {
        let gpu = amd::to_gpu_info(&reading);
        return (Platform::AmdRocm, gpu, FormFactor::desktop());
    }

    if let Some(reading) = apple::probe(runner, timeout) {
        let (gpu, used_default) = apple::to_gpu_info(&reading);
        if used_default {
            warnings.push(ProbeWarning::new(
                "gpu.memory_bandwidth_gbps",
                format!("no bandwidth table entry for '{}'; using conservative default", reading.chip_name),
            ));
        }
        return (Platform::AppleSilicon, gpu, FormFactor::desktop());
    }

    warnings.push(ProbeWarning::new(
        "gpu",
        "no NVIDIA, AMD, or Apple Silicon GPU detected; falling back to CPU-only",
    ));
    (
        Platform::CpuOnly,
        GpuInfo {
            vendor: GpuVendor::None,
            name: "none".into(),
            vram_gb: 0.0,
            memory_bandwidth_gbps: 0.0,
            compute_capability: None,
            supports_fp8: false,
            supports_bf16: false,
            supports_fp4: false,
            flash_attention: false,
            unified_memory: false,
        },
        FormFactor::desktop(),
    )
}

fn current_volume_path() -> std::path::PathBuf {
    env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf())
}

/// Linux/`/sys/class/power_supply` AC-online check; defaults to `Ac` on
/// platforms (or errors) where this can't be determined, since most
/// recommendation runs happen on plugged-in desktops/workstations.
fn detect_power_state() -> PowerState {
    if let Ok(entries) = std::fs::read_dir("/sys/class/power_supply") {
        for entry in entries.flatten() {
            let online_path = entry.path().join("online");
            if let Ok(contents) = std::fs::read_to_string(&online_path) {
                if contents.trim() == "0" {
                    return PowerState::Battery;
                }
            }
        }
    }
    PowerState::Ac
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubRunner(HashMap<&'static str, &'static str>);

    impl CommandRunner for StubRunner {
        fn run(&self, program: &str, args: &[&str], _timeout: Duration) -> Option<String> {
            let key: &str = if program == "rocm-smi" {
                args.last().copied().unwrap_or("")
            } else {
                program
            };
            self.0.get(key).map(|s| s.to_string())
        }
    }

    #[test]
    fn detect_falls_back_to_cpu_only_when_no_vendor_tool_present() {
        let runner = StubRunner(HashMap::new());
        let profile = detect_with_runner(&runner, Duration::from_secs(1)).unwrap();
        assert_eq!(profile.platform, Platform::CpuOnly);
        assert_eq!(profile.gpu.vendor, GpuVendor::None);
        assert!(profile.warnings.iter().any(|w| w.field == "gpu"));
    }

    #[test]
    fn detect_prefers_nvidia_over_other_vendors() {
        let mut stub = HashMap::new();
        stub.insert(
            "nvidia-smi",
            "NVIDIA GeForce RTX 4090, 24564, 8.9, 450.00\n",
        );
        stub.insert("vram", "GPU[0]\t: vram Total Memory (MB): 16368\n");
        let runner = StubRunner(stub);
        let profile = detect_with_runner(&runner, Duration::from_secs(1)).unwrap();
        assert_eq!(profile.platform, Platform::NvidiaDesktop);
        assert_eq!(profile.gpu.vendor, GpuVendor::Nvidia);
    }

    #[test]
    fn power_state_defaults_to_ac_without_sysfs() {
        assert_eq!(detect_power_state(), PowerState::Ac);
    }
}
