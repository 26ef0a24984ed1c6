//! Layer 1 — constraint satisfaction (§4.3).
//!
//! A binary feasibility filter: for each catalog candidate, either a
//! [`PassingCandidate`] (with the best-quality variant that fits) or a
//! [`RejectionReason`] naming the first check that failed. VRAM is the one
//! check with a rescue path — a candidate that doesn't fit natively still
//! passes if CPU offload is viable.

use recommend_core::candidate::{Constraint, ExecutionMode, PassingCandidate, RejectionReason};
use recommend_core::catalog::{CatalogEntry, Variant};
use recommend_core::defaults::STORAGE_BUFFER_GB;
use recommend_core::hardware::{HardwareProfile, Platform};
use recommend_core::user_profile::UserProfile;

/// Filter every candidate in `entries` against `hardware`/`user`,
/// returning passing candidates and rejections in input order (§4.3
/// determinism clause).
pub fn filter_candidates(
    entries: &[&CatalogEntry],
    hardware: &HardwareProfile,
    user: &UserProfile,
) -> (Vec<PassingCandidate>, Vec<RejectionReason>) {
    let mut passing = Vec::new();
    let mut rejected = Vec::new();
    for entry in entries {
        match filter_one(entry, hardware, user) {
            Ok(p) => passing.push(p),
            Err(r) => rejected.push(r),
        }
    }
    (passing, rejected)
}

/// Run the full ordered check sequence for a single entry.
pub fn filter_one(
    entry: &CatalogEntry,
    hardware: &HardwareProfile,
    user: &UserProfile,
) -> Result<PassingCandidate, RejectionReason> {
    if entry.incompatibilities.contains(&hardware.platform) {
        return Err(reject(
            entry,
            Constraint::Incompat,
            format!("{} is excluded from {:?} recommendations", entry.id, hardware.platform),
            0.0,
            0.0,
        ));
    }

    let candidate_variants = eligible_variants(entry, hardware.platform);
    if candidate_variants.is_empty() {
        return Err(reject(
            entry,
            Constraint::Platform,
            format!("no variant of {} declares support for {:?}", entry.id, hardware.platform),
            0.0,
            0.0,
        ));
    }

    let cc_filtered = compute_capability_filter(&candidate_variants, hardware);
    if cc_filtered.is_empty() {
        return Err(reject(
            entry,
            Constraint::ComputeCapability,
            format!(
                "no variant of {} is supported at this device's compute capability",
                entry.id
            ),
            0.0,
            0.0,
        ));
    }

    let native_fit = cc_filtered
        .iter()
        .find(|v| (v.vram_min_mb as f32 / 1024.0) <= hardware.effective_vram_gb)
        .copied();

    let (variant, mode) = if let Some(v) = native_fit {
        (Some(v), ExecutionMode::GpuNative)
    } else if let Some(v) = offload_rescue(entry, &cc_filtered, hardware) {
        (Some(v), ExecutionMode::GpuOffload)
    } else if entry.cloud.available && user.cloud_willingness.allows_cloud() {
        (None, ExecutionMode::Cloud)
    } else {
        let smallest = cc_filtered
            .iter()
            .min_by_key(|v| v.vram_min_mb)
            .expect("non-empty after compute-capability filter");
        return Err(reject(
            entry,
            Constraint::Vram,
            format!(
                "{} requires at least {:.1} GB VRAM; {:.1} GB effective VRAM available",
                entry.id,
                smallest.vram_min_mb as f32 / 1024.0,
                hardware.effective_vram_gb
            ),
            smallest.vram_min_mb as f32 / 1024.0,
            hardware.effective_vram_gb,
        ));
    };

    // Cloud escapes skip the local storage/RAM checks entirely — nothing
    // is downloaded or resident.
    if mode != ExecutionMode::Cloud {
        if hardware.storage.free_gb < entry.hardware.total_size_gb + STORAGE_BUFFER_GB {
            return Err(reject(
                entry,
                Constraint::StorageSpace,
                format!(
                    "{} needs {:.1} GB free (incl. {:.0} GB buffer); {:.1} GB free",
                    entry.id,
                    entry.hardware.total_size_gb + STORAGE_BUFFER_GB,
                    STORAGE_BUFFER_GB,
                    hardware.storage.free_gb
                ),
                entry.hardware.total_size_gb + STORAGE_BUFFER_GB,
                hardware.storage.free_gb,
            ));
        }

        if hardware.ram.available_gb < entry.hardware.minimum_ram_gb {
            return Err(reject(
                entry,
                Constraint::Ram,
                format!(
                    "{} requires {:.1} GB RAM; {:.1} GB available",
                    entry.id, entry.hardware.minimum_ram_gb, hardware.ram.available_gb
                ),
                entry.hardware.minimum_ram_gb,
                hardware.ram.available_gb,
            ));
        }
    }

    Ok(PassingCandidate {
        model_id: entry.id.clone(),
        selected_variant: variant.map(|v| v.id.clone()),
        execution_mode: mode,
    })
}

/// Variants declared supported on `platform`, with Apple Silicon's
/// K-quant exclusion applied (only `q8_0`/`q5_0`/`q4_0` survive there).
fn eligible_variants(entry: &CatalogEntry, platform: Platform) -> Vec<&Variant> {
    entry
        .variants_for_platform(platform)
        .into_iter()
        .filter(|v| !(platform.is_apple_silicon() && v.precision.is_k_quant()))
        .collect()
}

/// Remove variants whose declared minimum compute capability the device
/// does not meet (this also removes FP8 variants pre-8.9, since those
/// variants declare `min_compute_capability = Some((8, 9))`).
fn compute_capability_filter<'a>(
    variants: &[&'a Variant],
    hardware: &HardwareProfile,
) -> Vec<&'a Variant> {
    variants
        .iter()
        .filter(|v| {
            let support = v.platform_support.for_platform(hardware.platform);
            match support.min_compute_capability {
                None => true,
                Some(required) => match hardware.gpu.compute_capability {
                    Some(actual) => actual >= required,
                    None => false,
                },
            }
        })
        .copied()
        .collect()
}

/// §4.3.4 offload rescue: selects the smallest-VRAM variant that survived
/// prior filters, gated on CPU tier, AVX2 (for GGUF), and usable offload
/// RAM.
fn offload_rescue<'a>(
    entry: &CatalogEntry,
    variants: &[&'a Variant],
    hardware: &HardwareProfile,
) -> Option<&'a Variant> {
    if !entry.hardware.supports_cpu_offload {
        return None;
    }
    if !hardware.cpu.tier.offload_eligible() {
        return None;
    }
    let smallest = *variants.iter().min_by_key(|v| v.vram_min_mb)?;
    if matches!(smallest.precision, recommend_core::catalog::Precision::Gguf(_))
        && !hardware.cpu.supports_avx2
    {
        return None;
    }
    let required_gb = entry
        .hardware
        .ram_for_offload_gb
        .unwrap_or(smallest.vram_min_mb as f32 / 1024.0);
    if hardware.ram.usable_for_offload_gb >= required_gb {
        Some(smallest)
    } else {
        None
    }
}

fn reject(
    entry: &CatalogEntry,
    constraint: Constraint,
    detail: String,
    required: f32,
    available: f32,
) -> RejectionReason {
    RejectionReason {
        model_id: entry.id.clone(),
        constraint,
        detail,
        required,
        available,
    }
}
