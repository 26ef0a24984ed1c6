//! NVIDIA GPU probing via `nvidia-smi`.

use std::time::Duration;

use crate::command::{first_number, CommandRunner};
use crate::error::Result;

use super::tables::{nvidia_memory_bandwidth_gbps, nvidia_reference_tdp_watts};
use super::{FormFactor, GpuInfo, GpuVendor};

/// Raw facts read off `nvidia-smi` for the first enumerated device.
pub struct NvidiaReading {
    pub name: String,
    pub vram_gb: f32,
    pub compute_capability: (u32, u32),
    pub power_limit_watts: Option<f32>,
}

/// Query `nvidia-smi` for the primary device's name, VRAM, compute
/// capability, and current power limit. Returns `None` if no NVIDIA
/// device/driver is present (not an error — the orchestrator falls back
/// to the next platform probe).
pub fn probe(runner: &dyn CommandRunner, timeout: Duration) -> Option<NvidiaReading> {
    let csv = runner.run(
        "nvidia-smi",
        &[
            "--query-gpu=name,memory.total,compute_cap,power.limit",
            "--format=csv,noheader,nounits",
        ],
        timeout,
    )?;
    let line = csv.lines().next()?;
    let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
    if parts.len() < 3 {
        return None;
    }

    let name = parts[0].to_string();
    let vram_mb: f64 = first_number("nvidia-smi", parts[1]).ok()?;
    let compute_capability = parse_compute_capability(parts[2])?;
    let power_limit_watts = parts
        .get(3)
        .and_then(|s| first_number("nvidia-smi", s).ok())
        .map(|v| v as f32);

    Some(NvidiaReading {
        name,
        vram_gb: (vram_mb / 1024.0) as f32,
        compute_capability,
        power_limit_watts,
    })
}

fn parse_compute_capability(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.trim().splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

/// Build the normalized [`GpuInfo`] and inferred [`FormFactor`] for an
/// NVIDIA reading, per the capability-by-compute-capability rules in
/// §4.1: FP8 ⇔ CC ≥ 8.9, BF16 ⇔ CC ≥ 8.0, flash-attention ⇔ CC ≥ 8.0,
/// FP4 ⇔ CC ≥ 12.0. Laptop is inferred when the observed power limit is
/// below 85% of the device's desktop reference TDP. Returns whether the
/// memory-bandwidth table had to fall back to its conservative default, so
/// the caller can record a warning instead of silently trusting it.
pub fn to_profile_facts(reading: NvidiaReading) -> Result<(GpuInfo, FormFactor, bool, bool)> {
    let (major, minor) = reading.compute_capability;
    let cc = major as f32 + minor as f32 / 10.0;

    let (memory_bandwidth_gbps, bandwidth_used_default) =
        match nvidia_memory_bandwidth_gbps(&reading.name) {
            Some(bw) => (bw, false),
            None => (crate::defaults::NVIDIA_UNKNOWN_DEVICE_BANDWIDTH_GBPS, true),
        };

    let gpu = GpuInfo {
        vendor: GpuVendor::Nvidia,
        name: reading.name.clone(),
        vram_gb: reading.vram_gb,
        memory_bandwidth_gbps,
        compute_capability: Some((major, minor)),
        supports_fp8: cc >= 8.9,
        supports_bf16: cc >= 8.0,
        supports_fp4: cc >= 12.0,
        flash_attention: cc >= 8.0,
        unified_memory: false,
    };

    let reference_tdp = nvidia_reference_tdp_watts(&reading.name);
    let is_laptop = reading.name.to_lowercase().contains("laptop")
        || match (reading.power_limit_watts, reference_tdp) {
            (Some(limit), Some(reference)) => limit < reference * 0.85,
            _ => false,
        };

    let form_factor = match (is_laptop, reading.power_limit_watts, reference_tdp) {
        (true, Some(limit), Some(reference)) => FormFactor::laptop(limit, reference),
        (true, _, _) => FormFactor::laptop(0.0, 1.0), // ratio clamps to SUSTAINED_RATIO_MIN
        (false, _, _) => FormFactor::desktop(),
    };

    Ok((gpu, form_factor, is_laptop, bandwidth_used_default))
}
