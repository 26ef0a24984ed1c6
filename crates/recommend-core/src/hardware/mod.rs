//! Normalized hardware facts consumed by the recommender pipeline.
//!
//! [`HardwareProfile`] is built once per run by [`probe::detect`] (or
//! supplied directly by a caller, e.g. in tests) and is immutable and
//! `Clone` thereafter — nothing downstream mutates it. Every derived field
//! (`effective_vram_gb`, `tier`, `sustained_performance_ratio`,
//! `usable_for_offload_gb`) is computed by this module so the constraint,
//! content and TOPSIS layers never re-derive hardware facts themselves.

mod probe;
mod tables;

pub mod amd;
pub mod apple;
pub mod cpu_ram_storage;
pub mod nvidia;

pub use probe::{detect, detect_with_runner, ProbeWarning};
pub use tables::{
    apple_chip_bandwidth_gbps, nvidia_reference_tdp_watts, ram_bandwidth_gbps,
    storage_read_mbps_for_tier,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    OFFLOAD_SAFETY_FACTOR, OFFLOAD_TIER_FLOOR_GB, OS_RESERVE_GB, SUSTAINED_RATIO_MAX,
    SUSTAINED_RATIO_MIN, TIER_BOUNDARY_CONSUMER_GB, TIER_BOUNDARY_ENTRY_GB,
    TIER_BOUNDARY_PROFESSIONAL_GB, TIER_BOUNDARY_PROSUMER_GB, TIER_BOUNDARY_WORKSTATION_GB,
    UNIFIED_MEMORY_VRAM_FRACTION,
};
use crate::error::{Error, Result};

/// Hardware platform family. Drives catalog `platform_support` lookups and
/// the resolution cascade's quantization preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    NvidiaDesktop,
    NvidiaLaptop,
    AppleSilicon,
    AmdRocm,
    CpuOnly,
}

impl Platform {
    pub fn is_nvidia(&self) -> bool {
        matches!(self, Platform::NvidiaDesktop | Platform::NvidiaLaptop)
    }

    pub fn is_apple_silicon(&self) -> bool {
        matches!(self, Platform::AppleSilicon)
    }
}

/// GPU vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuVendor {
    Nvidia,
    Apple,
    Amd,
    None,
}

/// Detected GPU facts. `compute_capability` is `None` on non-NVIDIA
/// hardware; the `supports_*` flags are derived from it per §4.1 and are
/// never independently detected on NVIDIA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub vendor: GpuVendor,
    pub name: String,
    pub vram_gb: f32,
    pub memory_bandwidth_gbps: f32,
    pub compute_capability: Option<(u32, u32)>,
    pub supports_fp8: bool,
    pub supports_bf16: bool,
    pub supports_fp4: bool,
    pub flash_attention: bool,
    pub unified_memory: bool,
}

/// CPU capability tier, classified by physical core count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuTier {
    Minimal,
    Low,
    Medium,
    High,
}

impl CpuTier {
    /// Classify by physical core count: HIGH >= 16, MEDIUM 8-15, LOW 4-7,
    /// MINIMAL < 4.
    pub fn from_physical_cores(cores: u32) -> Self {
        match cores {
            c if c >= 16 => CpuTier::High,
            c if c >= 8 => CpuTier::Medium,
            c if c >= 4 => CpuTier::Low,
            _ => CpuTier::Minimal,
        }
    }

    /// Tiers that are eligible to act as CPU-offload rescue targets (§4.3.4).
    pub fn offload_eligible(&self) -> bool {
        matches!(self, CpuTier::High | CpuTier::Medium)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub model: String,
    pub physical_cores: u32,
    pub logical_cores: u32,
    pub arch: String,
    pub supports_avx: bool,
    pub supports_avx2: bool,
    pub supports_avx512: bool,
    pub tier: CpuTier,
}

/// RAM technology generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RamType {
    Ddr4,
    Ddr5,
    Lpddr5,
    Unified,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamInfo {
    pub total_gb: f32,
    pub available_gb: f32,
    pub ram_type: RamType,
    pub speed_mhz: Option<u32>,
    pub bandwidth_gbps: f32,
    /// `max(0, (available_gb - OS_RESERVE_GB) * OFFLOAD_SAFETY_FACTOR)`.
    pub usable_for_offload_gb: f32,
}

impl RamInfo {
    pub fn new(
        total_gb: f32,
        available_gb: f32,
        ram_type: RamType,
        speed_mhz: Option<u32>,
        bandwidth_gbps: f32,
    ) -> Self {
        let usable_for_offload_gb =
            ((available_gb - OS_RESERVE_GB) * OFFLOAD_SAFETY_FACTOR).max(0.0);
        Self {
            total_gb,
            available_gb,
            ram_type,
            speed_mhz,
            bandwidth_gbps,
            usable_for_offload_gb,
        }
    }
}

/// Storage device hardware type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    Nvme,
    SataSsd,
    Hdd,
    Unknown,
}

/// Storage throughput tier, used by the explainer and the speed_fit
/// criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
    Slow,
    Moderate,
    Fast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub free_gb: f32,
    pub total_gb: f32,
    pub storage_type: StorageType,
    pub tier: StorageTier,
    pub read_mbps: f32,
}

/// Chassis / power-delivery facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFactor {
    pub is_laptop: bool,
    pub power_limit_watts: Option<f32>,
    pub reference_tdp_watts: Option<f32>,
    /// `sqrt(power_limit / reference_tdp)` clamped to `[0.25, 1.0]`; `1.0`
    /// for desktops.
    pub sustained_performance_ratio: f32,
}

impl FormFactor {
    pub fn desktop() -> Self {
        Self {
            is_laptop: false,
            power_limit_watts: None,
            reference_tdp_watts: None,
            sustained_performance_ratio: SUSTAINED_RATIO_MAX,
        }
    }

    pub fn laptop(power_limit_watts: f32, reference_tdp_watts: f32) -> Self {
        let ratio = if reference_tdp_watts > 0.0 {
            (power_limit_watts / reference_tdp_watts).sqrt()
        } else {
            SUSTAINED_RATIO_MIN
        }
        .clamp(SUSTAINED_RATIO_MIN, SUSTAINED_RATIO_MAX);
        Self {
            is_laptop: true,
            power_limit_watts: Some(power_limit_watts),
            reference_tdp_watts: Some(reference_tdp_watts),
            sustained_performance_ratio: ratio,
        }
    }
}

/// Thermal throttling advisory, read from the platform's thermal API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalState {
    Nominal,
    Fair,
    Serious,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Ac,
    Battery,
}

/// Effective-capacity hardware tier, computed over `effective_vram_gb` plus
/// any CPU-offload headroom that counts toward capacity (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityTier {
    Minimal,
    Entry,
    Consumer,
    Prosumer,
    Professional,
    Workstation,
}

impl CapacityTier {
    /// Classify effective capacity (GB) into a tier. Non-strict at
    /// boundaries: a value exactly at a boundary lands in the higher tier.
    pub fn from_effective_capacity_gb(capacity_gb: f32) -> Self {
        if capacity_gb >= TIER_BOUNDARY_WORKSTATION_GB {
            CapacityTier::Workstation
        } else if capacity_gb >= TIER_BOUNDARY_PROFESSIONAL_GB {
            CapacityTier::Professional
        } else if capacity_gb >= TIER_BOUNDARY_PROSUMER_GB {
            CapacityTier::Prosumer
        } else if capacity_gb >= TIER_BOUNDARY_CONSUMER_GB {
            CapacityTier::Consumer
        } else if capacity_gb >= TIER_BOUNDARY_ENTRY_GB {
            CapacityTier::Entry
        } else {
            CapacityTier::Minimal
        }
    }
}

/// Immutable, normalized hardware facts for a single recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub platform: Platform,
    pub gpu: GpuInfo,
    pub cpu: CpuInfo,
    pub ram: RamInfo,
    pub storage: StorageInfo,
    pub form_factor: FormFactor,
    pub thermal_state: ThermalState,
    pub power_state: PowerState,
    pub effective_vram_gb: f32,
    pub tier: CapacityTier,
    /// Non-fatal probe failures collected during detection (empty when the
    /// profile was hand-built, e.g. in tests).
    pub warnings: Vec<ProbeWarning>,
}

impl HardwareProfile {
    /// Build a profile from raw facts, computing `effective_vram_gb` and
    /// `tier` and validating invariants. This is the single construction
    /// path — callers (including the probe) never set the derived fields
    /// directly.
    pub fn build(
        platform: Platform,
        gpu: GpuInfo,
        cpu: CpuInfo,
        ram: RamInfo,
        storage: StorageInfo,
        form_factor: FormFactor,
        thermal_state: ThermalState,
        power_state: PowerState,
        warnings: Vec<ProbeWarning>,
    ) -> Result<Self> {
        if gpu.vram_gb < 0.0 {
            return Err(Error::InvariantViolated(
                "gpu.vram_gb must not be negative".into(),
            ));
        }
        if ram.total_gb <= 0.0 {
            return Err(Error::InvariantViolated(
                "ram.total_gb must be positive".into(),
            ));
        }

        let effective_vram_gb = if gpu.unified_memory {
            ram.total_gb * UNIFIED_MEMORY_VRAM_FRACTION
        } else {
            gpu.vram_gb
        };

        let has_accelerator = gpu.unified_memory || gpu.vram_gb > 0.0;
        if has_accelerator != (effective_vram_gb > 0.0) {
            return Err(Error::InvariantViolated(
                "effective_vram_gb must be positive iff a usable accelerator or unified memory is present".into(),
            ));
        }

        let offload_counts =
            cpu.tier.offload_eligible() && ram.usable_for_offload_gb > OFFLOAD_TIER_FLOOR_GB;
        let effective_capacity_gb = effective_vram_gb
            + if offload_counts {
                ram.usable_for_offload_gb
            } else {
                0.0
            };
        let tier = CapacityTier::from_effective_capacity_gb(effective_capacity_gb);

        Ok(Self {
            platform,
            gpu,
            cpu,
            ram,
            storage,
            form_factor,
            thermal_state,
            power_state,
            effective_vram_gb,
            tier,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(vram_gb: f32, unified: bool) -> GpuInfo {
        GpuInfo {
            vendor: if unified { GpuVendor::Apple } else { GpuVendor::Nvidia },
            name: "test-gpu".into(),
            vram_gb,
            memory_bandwidth_gbps: 500.0,
            compute_capability: if unified { None } else { Some((8, 9)) },
            supports_fp8: !unified,
            supports_bf16: true,
            supports_fp4: false,
            flash_attention: true,
            unified_memory: unified,
        }
    }

    fn cpu(physical_cores: u32) -> CpuInfo {
        CpuInfo {
            model: "test-cpu".into(),
            physical_cores,
            logical_cores: physical_cores * 2,
            arch: "x86_64".into(),
            supports_avx: true,
            supports_avx2: true,
            supports_avx512: false,
            tier: CpuTier::from_physical_cores(physical_cores),
        }
    }

    fn storage() -> StorageInfo {
        StorageInfo {
            free_gb: 500.0,
            total_gb: 2000.0,
            storage_type: StorageType::Nvme,
            tier: StorageTier::Fast,
            read_mbps: 7000.0,
        }
    }

    #[test]
    fn effective_vram_native_gpu_equals_vram_gb() {
        let profile = HardwareProfile::build(
            Platform::NvidiaDesktop,
            gpu(24.0, false),
            cpu(16),
            RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
            storage(),
            FormFactor::desktop(),
            ThermalState::Nominal,
            PowerState::Ac,
            vec![],
        )
        .unwrap();
        assert_eq!(profile.effective_vram_gb, 24.0);
        assert_eq!(profile.tier, CapacityTier::Workstation);
    }

    #[test]
    fn effective_vram_unified_memory_is_75_percent_of_total_ram() {
        let profile = HardwareProfile::build(
            Platform::AppleSilicon,
            gpu(0.0, true),
            cpu(8),
            RamInfo::new(8.0, 5.0, RamType::Unified, None, 68.0),
            storage(),
            FormFactor::desktop(),
            ThermalState::Nominal,
            PowerState::Battery,
            vec![],
        )
        .unwrap();
        assert_eq!(profile.effective_vram_gb, 6.0);
    }

    #[test]
    fn tier_boundary_is_inclusive_of_the_higher_tier() {
        assert_eq!(
            CapacityTier::from_effective_capacity_gb(8.0),
            CapacityTier::Consumer
        );
        assert_eq!(
            CapacityTier::from_effective_capacity_gb(7.999),
            CapacityTier::Entry
        );
        assert_eq!(
            CapacityTier::from_effective_capacity_gb(48.0),
            CapacityTier::Workstation
        );
        assert_eq!(
            CapacityTier::from_effective_capacity_gb(16.0),
            CapacityTier::Professional
        );
        assert_eq!(
            CapacityTier::from_effective_capacity_gb(12.0),
            CapacityTier::Prosumer
        );
    }

    #[test]
    fn offload_capacity_only_counts_for_high_and_medium_cpu_tiers() {
        let low_cpu = HardwareProfile::build(
            Platform::NvidiaDesktop,
            gpu(8.0, false),
            cpu(6), // LOW tier
            RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
            storage(),
            FormFactor::desktop(),
            ThermalState::Nominal,
            PowerState::Ac,
            vec![],
        )
        .unwrap();
        // 8GB VRAM alone -> Consumer, offload should not lift it to Workstation.
        assert_eq!(low_cpu.tier, CapacityTier::Consumer);

        let high_cpu = HardwareProfile::build(
            Platform::NvidiaDesktop,
            gpu(8.0, false),
            cpu(16), // HIGH tier
            RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
            storage(),
            FormFactor::desktop(),
            ThermalState::Nominal,
            PowerState::Ac,
            vec![],
        )
        .unwrap();
        // 8GB + ~41.6GB usable offload -> Workstation.
        assert_eq!(high_cpu.tier, CapacityTier::Workstation);
    }

    #[test]
    fn negative_vram_is_an_invariant_violation() {
        let mut bad_gpu = gpu(8.0, false);
        bad_gpu.vram_gb = -1.0;
        let result = HardwareProfile::build(
            Platform::NvidiaDesktop,
            bad_gpu,
            cpu(16),
            RamInfo::new(64.0, 56.0, RamType::Ddr5, Some(6000), 64.0),
            storage(),
            FormFactor::desktop(),
            ThermalState::Nominal,
            PowerState::Ac,
            vec![],
        );
        assert!(matches!(result, Err(Error::InvariantViolated(_))));
    }

    #[test]
    fn laptop_ratio_matches_sqrt_of_power_ratio_and_clamps() {
        let ff = FormFactor::laptop(175.0, 450.0);
        assert!((ff.sustained_performance_ratio - (175.0f32 / 450.0).sqrt()).abs() < 1e-4);

        let clamped_low = FormFactor::laptop(10.0, 450.0);
        assert_eq!(clamped_low.sustained_performance_ratio, SUSTAINED_RATIO_MIN);
    }

    #[test]
    fn usable_for_offload_gb_floors_at_zero() {
        let ram = RamInfo::new(4.0, 3.0, RamType::Ddr4, Some(2666), 20.0);
        assert_eq!(ram.usable_for_offload_gb, 0.0);
    }
}
