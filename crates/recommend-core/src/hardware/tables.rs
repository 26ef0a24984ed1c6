//! Declarative lookup tables for hardware probing.
//!
//! Per the design notes, GPU/RAM bandwidth, reference TDP, storage
//! throughput, and chip→bandwidth mappings are data, not code branches. A
//! table miss returns `None` so the caller can record a warning and apply
//! a conservative, explicitly logged default — never a silent one.

use super::{RamType, StorageTier};

/// Apple Silicon chip name → unified memory bandwidth (GB/s).
const APPLE_CHIP_BANDWIDTH_TABLE: &[(&str, f32)] = &[
    ("Apple M1", 68.0),
    ("Apple M1 Pro", 200.0),
    ("Apple M1 Max", 400.0),
    ("Apple M1 Ultra", 800.0),
    ("Apple M2", 100.0),
    ("Apple M2 Pro", 200.0),
    ("Apple M2 Max", 400.0),
    ("Apple M2 Ultra", 800.0),
    ("Apple M3", 100.0),
    ("Apple M3 Pro", 150.0),
    ("Apple M3 Max", 400.0),
    ("Apple M4", 120.0),
    ("Apple M4 Pro", 273.0),
    ("Apple M4 Max", 546.0),
];

/// Look up unified-memory bandwidth (GB/s) for an Apple Silicon chip name.
/// Matching is case-sensitive substring containment against the table,
/// most-specific entries first (callers should prefer an exact match).
pub fn apple_chip_bandwidth_gbps(chip_name: &str) -> Option<f32> {
    APPLE_CHIP_BANDWIDTH_TABLE
        .iter()
        .find(|(name, _)| *name == chip_name)
        .map(|(_, bw)| *bw)
}

/// NVIDIA device name → reference TDP (watts), used to infer a laptop's
/// sustained-performance ratio from its observed power limit. Laptop
/// variants are listed before their desktop counterparts since lookup is
/// substring containment and "RTX 4090" would otherwise also match
/// "RTX 4090 Laptop GPU".
const NVIDIA_REFERENCE_TDP_TABLE: &[(&str, f32)] = &[
    ("RTX 4090 Laptop GPU", 175.0),
    ("RTX 4090", 450.0),
    ("RTX 4080 Laptop GPU", 150.0),
    ("RTX 4080", 320.0),
    ("RTX 4070 Laptop GPU", 115.0),
    ("RTX 4070", 200.0),
    ("RTX 4060 Laptop GPU", 80.0),
    ("RTX 4060", 115.0),
    ("RTX 3090", 350.0),
    ("RTX 3080", 320.0),
    ("RTX 3070", 220.0),
    ("RTX 3060", 170.0),
    ("A6000", 300.0),
    ("A100", 400.0),
    ("H100", 700.0),
];

/// Look up the desktop reference TDP (watts) for an NVIDIA device name.
pub fn nvidia_reference_tdp_watts(device_name: &str) -> Option<f32> {
    NVIDIA_REFERENCE_TDP_TABLE
        .iter()
        .find(|(name, _)| device_name.contains(*name))
        .map(|(_, tdp)| *tdp)
}

/// NVIDIA device name → memory bandwidth (GB/s). `nvidia-smi` does not
/// report this directly, so it is looked up by device class the same way
/// reference TDP is.
/// Laptop variants are listed before their desktop counterparts for the
/// same substring-precedence reason as [`NVIDIA_REFERENCE_TDP_TABLE`].
const NVIDIA_MEMORY_BANDWIDTH_TABLE: &[(&str, f32)] = &[
    ("RTX 4090 Laptop GPU", 432.0),
    ("RTX 4090", 1008.0),
    ("RTX 4080 Laptop GPU", 432.0),
    ("RTX 4080", 717.0),
    ("RTX 4070 Laptop GPU", 256.0),
    ("RTX 4070", 504.0),
    ("RTX 4060 Laptop GPU", 256.0),
    ("RTX 4060", 272.0),
    ("RTX 3090", 936.0),
    ("RTX 3080", 760.0),
    ("RTX 3070", 448.0),
    ("RTX 3060", 360.0),
    ("A6000", 768.0),
    ("A100", 1935.0),
    ("H100", 3350.0),
];

/// Look up memory bandwidth (GB/s) for an NVIDIA device name.
pub fn nvidia_memory_bandwidth_gbps(device_name: &str) -> Option<f32> {
    NVIDIA_MEMORY_BANDWIDTH_TABLE
        .iter()
        .find(|(name, _)| device_name.contains(*name))
        .map(|(_, bw)| *bw)
}

/// `(ram_type, channels)` → bandwidth (GB/s), using the JEDEC per-channel
/// rate at the type's typical baseline speed.
const RAM_BANDWIDTH_TABLE: &[(RamType, u32, f32)] = &[
    (RamType::Ddr4, 2, 38.4),
    (RamType::Ddr5, 2, 64.0),
    (RamType::Lpddr5, 1, 51.2),
    (RamType::Unified, 1, 100.0),
];

/// Look up RAM bandwidth (GB/s) for a `(type, channels)` pair.
pub fn ram_bandwidth_gbps(ram_type: RamType, channels: u32) -> Option<f32> {
    RAM_BANDWIDTH_TABLE
        .iter()
        .find(|(t, c, _)| *t == ram_type && *c == channels)
        .map(|(_, _, bw)| *bw)
}

/// Storage tier → representative sequential read throughput (MB/s).
const STORAGE_READ_MBPS_TABLE: &[(StorageTier, f32)] = &[
    (StorageTier::Fast, 7000.0),    // NVMe Gen4
    (StorageTier::Moderate, 600.0), // SATA SSD
    (StorageTier::Slow, 140.0),     // HDD
];

/// Look up representative read throughput (MB/s) for a storage tier.
pub fn storage_read_mbps_for_tier(tier: StorageTier) -> f32 {
    STORAGE_READ_MBPS_TABLE
        .iter()
        .find(|(t, _)| *t == tier)
        .map(|(_, mbps)| *mbps)
        .unwrap_or(140.0)
}
