//! Cross-platform CPU, RAM, and storage probing via `sysinfo`.
//!
//! Unlike the GPU probes, these subsystems don't need vendor-specific
//! tooling — `sysinfo` already normalizes Linux/`/proc`, macOS `sysctl`,
//! and Windows WMI behind one API, so this module does the platform
//! normalization *after* `sysinfo` instead of shelling out itself.

use std::path::Path;

use sysinfo::{Disks, System};

use super::{CpuInfo, CpuTier, RamInfo, RamType, StorageInfo, StorageTier, StorageType};
use crate::defaults::OS_RESERVE_GB;

/// Detect CPU facts: model, core counts, architecture, and SIMD flags.
///
/// `sysinfo` does not expose AVX/AVX2/AVX512 flags directly, so those are
/// read via `is_x86_feature_detected!` on x86_64 targets; on other
/// architectures (Apple Silicon, ARM) they are unconditionally `false`
/// since GGUF kernels gate on them specifically for x86 SIMD paths.
pub fn detect_cpu(sys: &System) -> CpuInfo {
    let model = sys
        .cpus()
        .first()
        .map(|c| c.brand().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let physical_cores = System::physical_core_count().unwrap_or(1) as u32;
    let logical_cores = sys.cpus().len().max(1) as u32;

    let (supports_avx, supports_avx2, supports_avx512) = detect_simd_flags();

    CpuInfo {
        model,
        physical_cores,
        logical_cores,
        arch: std::env::consts::ARCH.to_string(),
        supports_avx,
        supports_avx2,
        supports_avx512,
        tier: CpuTier::from_physical_cores(physical_cores),
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_simd_flags() -> (bool, bool, bool) {
    (
        is_x86_feature_detected!("avx"),
        is_x86_feature_detected!("avx2"),
        is_x86_feature_detected!("avx512f"),
    )
}

#[cfg(not(target_arch = "x86_64"))]
fn detect_simd_flags() -> (bool, bool, bool) {
    (false, false, false)
}

/// Detect RAM facts. `ram_type`/`speed_mhz` are best-effort: `sysinfo` does
/// not expose DIMM generation, so non-unified-memory hosts report
/// `RamType::Unknown` with a `None` speed unless the caller already knows
/// (e.g. Apple Silicon, where the orchestrator overrides to `Unified`).
pub fn detect_ram(sys: &System) -> RamInfo {
    let total_gb = bytes_to_gb(sys.total_memory());
    let available_gb = bytes_to_gb(sys.available_memory());
    let bandwidth_gbps = super::tables::ram_bandwidth_gbps(RamType::Ddr4, 2).unwrap_or(38.4);
    RamInfo::new(total_gb, available_gb, RamType::Unknown, None, bandwidth_gbps)
}

fn bytes_to_gb(bytes: u64) -> f32 {
    bytes as f32 / 1024.0 / 1024.0 / 1024.0
}

/// Detect storage facts for the filesystem containing `path` (normally the
/// install target directory). Classifies by whether `sysinfo` reports the
/// backing disk as an SSD; NVMe vs. SATA is inferred from the declared
/// read-throughput tier rather than bus enumeration, which `sysinfo` does
/// not expose portably.
pub fn detect_storage(path: &Path) -> Option<StorageInfo> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let free_gb = bytes_to_gb(disk.available_space());
    let total_gb = bytes_to_gb(disk.total_space());
    let storage_type = if disk.is_removable() {
        StorageType::Unknown
    } else if disk.kind() == sysinfo::DiskKind::SSD {
        StorageType::Nvme
    } else if disk.kind() == sysinfo::DiskKind::HDD {
        StorageType::Hdd
    } else {
        StorageType::Unknown
    };

    let tier = match storage_type {
        StorageType::Nvme => StorageTier::Fast,
        StorageType::SataSsd => StorageTier::Moderate,
        StorageType::Hdd => StorageTier::Slow,
        StorageType::Unknown => StorageTier::Moderate,
    };
    let read_mbps = super::tables::storage_read_mbps_for_tier(tier);

    Some(StorageInfo {
        free_gb,
        total_gb,
        storage_type,
        tier,
        read_mbps,
    })
}

/// `max(0, (available_gb - OS_RESERVE_GB) * OFFLOAD_SAFETY_FACTOR)`,
/// exposed standalone for the explainer's warning thresholds.
pub fn usable_for_offload_gb(available_gb: f32, safety_factor: f32) -> f32 {
    ((available_gb - OS_RESERVE_GB) * safety_factor).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_to_gb_converts_binary_gigabytes() {
        assert!((bytes_to_gb(8 * 1024 * 1024 * 1024) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn usable_for_offload_matches_formula() {
        assert!((usable_for_offload_gb(60.0, 0.8) - 44.8).abs() < 1e-3);
        assert_eq!(usable_for_offload_gb(2.0, 0.8), 0.0);
    }

    #[test]
    fn detect_cpu_produces_plausible_tier() {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        let cpu = detect_cpu(&sys);
        assert_eq!(cpu.tier, CpuTier::from_physical_cores(cpu.physical_cores));
        assert!(cpu.logical_cores >= 1);
    }
}
