//! Resolution cascade (§4.6): rescue strategies applied, in fixed order,
//! to top-ranked candidates flagged `requires_resolution`.
//!
//! Each step is tried in turn; the first that produces a viable
//! `ResolutionResult` wins. None of the steps re-run Layer 1 or Layer 3 in
//! full — they re-check only the specific thing that made the original
//! selection marginal.

use std::collections::HashMap;

use recommend_core::candidate::{RankedCandidate, ResolutionKind, ResolutionResult};
use recommend_core::catalog::{Catalog, GgufQuant, Precision};
use recommend_core::config::CascadeConfig;
use recommend_core::hardware::{CpuTier, HardwareProfile, Platform};
use recommend_core::user_profile::UserProfile;

use crate::constraint::filter_one;

/// Platform-specific quantization preference order, highest quality first
/// (§4.6 step 1).
fn quantization_preference(platform: Platform) -> Vec<Precision> {
    match platform {
        Platform::NvidiaDesktop | Platform::NvidiaLaptop => vec![
            Precision::Fp16,
            Precision::Fp8,
            Precision::Gguf(GgufQuant::Q8),
            Precision::Gguf(GgufQuant::Q6),
            Precision::Gguf(GgufQuant::Q5KM),
            Precision::Gguf(GgufQuant::Q4KM),
        ],
        Platform::AppleSilicon => vec![
            Precision::Fp16,
            Precision::Gguf(GgufQuant::Q8),
            Precision::Gguf(GgufQuant::Q50),
            Precision::Gguf(GgufQuant::Q40),
        ],
        Platform::AmdRocm | Platform::CpuOnly => vec![
            Precision::Fp16,
            Precision::Gguf(GgufQuant::Q8),
            Precision::Gguf(GgufQuant::Q6),
            Precision::Gguf(GgufQuant::Q5KM),
            Precision::Gguf(GgufQuant::Q4KM),
        ],
    }
}

/// Step 1: scan the platform's quantization preference list for the first
/// variant whose `vram_min_mb` fits effective VRAM.
fn try_quantization_downgrade(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    hardware: &HardwareProfile,
) -> Option<ResolutionResult> {
    let entry = catalog.get(&candidate.passing.model_id)?;
    let eligible = entry.variants_for_platform(hardware.platform);
    let effective_mb = hardware.effective_vram_gb * 1024.0;

    for preferred in quantization_preference(hardware.platform) {
        if let Some(variant) = eligible
            .iter()
            .find(|v| v.precision == preferred && (v.vram_min_mb as f32) <= effective_mb)
        {
            return Some(ResolutionResult {
                viable: true,
                kind: ResolutionKind::QuantizationDowngrade,
                selected_variant: Some(variant.id.clone()),
                substituted_model_id: None,
                performance_factor: 1.0,
                quality_impact: format!(
                    "-{}%",
                    100u32.saturating_sub(variant.quality_retention_percent as u32)
                ),
                message: None,
            });
        }
    }
    None
}

/// Step 2: identical gating to the constraint layer's offload rescue,
/// re-expressed here since the cascade needs the performance factor, not
/// just a pass/fail.
fn try_cpu_offload(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    hardware: &HardwareProfile,
    cascade_config: &CascadeConfig,
) -> Option<ResolutionResult> {
    let entry = catalog.get(&candidate.passing.model_id)?;
    if !entry.hardware.supports_cpu_offload || !hardware.cpu.tier.offload_eligible() {
        return None;
    }
    let smallest = entry
        .variants_for_platform(hardware.platform)
        .into_iter()
        .filter(|v| !(hardware.platform.is_apple_silicon() && v.precision.is_k_quant()))
        .min_by_key(|v| v.vram_min_mb)?;

    if matches!(smallest.precision, Precision::Gguf(_)) && !hardware.cpu.supports_avx2 {
        return None;
    }
    let required_gb = entry
        .hardware
        .ram_for_offload_gb
        .unwrap_or(smallest.vram_min_mb as f32 / 1024.0);
    if hardware.ram.usable_for_offload_gb < required_gb {
        return None;
    }

    let performance_factor = match hardware.cpu.tier {
        CpuTier::High => cascade_config.offload_slowdown_high,
        CpuTier::Medium => cascade_config.offload_slowdown_medium,
        CpuTier::Low | CpuTier::Minimal => return None,
    };

    Some(ResolutionResult {
        viable: true,
        kind: ResolutionKind::CpuOffload,
        selected_variant: Some(smallest.id.clone()),
        substituted_model_id: None,
        performance_factor,
        quality_impact: "unchanged".to_string(),
        message: None,
    })
}

/// Step 3: family-level substitution map, consulted for the first
/// substitute that clears Layer 1's full check sequence. The map is a
/// caller-supplied table (no substitution data ships with the catalog
/// schema itself — see DESIGN.md) keyed by the failing model's `family`.
fn try_substitution(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    hardware: &HardwareProfile,
    user: &UserProfile,
    substitutions: &HashMap<String, Vec<String>>,
) -> Option<ResolutionResult> {
    let entry = catalog.get(&candidate.passing.model_id)?;
    let candidates = substitutions.get(&entry.family)?;
    for substitute_id in candidates {
        let Some(substitute_entry) = catalog.get(substitute_id) else {
            continue;
        };
        if let Ok(passing) = filter_one(substitute_entry, hardware, user) {
            return Some(ResolutionResult {
                viable: true,
                kind: ResolutionKind::Substitution,
                selected_variant: passing.selected_variant,
                substituted_model_id: Some(substitute_id.clone()),
                performance_factor: 1.0,
                quality_impact: "different model family".to_string(),
                message: None,
            });
        }
    }
    None
}

/// Step 4: always succeeds; never changes the selected model. A stand-in
/// for real batch-size/resolution caps, which are recommended by a
/// downstream UI, not computed here.
fn try_workflow_optimization(candidate: &RankedCandidate) -> ResolutionResult {
    ResolutionResult {
        viable: true,
        kind: ResolutionKind::WorkflowOptimization,
        selected_variant: candidate.passing.selected_variant.clone(),
        substituted_model_id: None,
        performance_factor: 1.0,
        quality_impact: "unchanged".to_string(),
        message: Some(
            "consider reducing batch size or output resolution for smoother iteration".to_string(),
        ),
    }
}

/// Step 5: cloud escape, if the catalog declares availability and the user
/// allows it.
fn try_cloud(catalog: &Catalog, candidate: &RankedCandidate, user: &UserProfile) -> Option<ResolutionResult> {
    let entry = catalog.get(&candidate.passing.model_id)?;
    if !entry.cloud.available || !user.cloud_willingness.allows_cloud() {
        return None;
    }
    Some(ResolutionResult {
        viable: true,
        kind: ResolutionKind::Cloud,
        selected_variant: None,
        substituted_model_id: None,
        performance_factor: 1.0,
        quality_impact: "full quality (remote)".to_string(),
        message: entry
            .cloud
            .estimated_cost_per_gen
            .map(|c| format!("estimated cost ${c:.3} per generation via {}", entry.cloud.service.clone().unwrap_or_default())),
    })
}

/// Run the full cascade for one marginal candidate, stopping at the first
/// viable step. Steps 1-2 never touch workflow optimization/cloud, which
/// are final fallbacks reached only when the earlier ones cannot rescue
/// VRAM fit at all.
pub fn resolve(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    hardware: &HardwareProfile,
    user: &UserProfile,
    cascade_config: &CascadeConfig,
    substitutions: &HashMap<String, Vec<String>>,
) -> ResolutionResult {
    if let Some(r) = try_quantization_downgrade(catalog, candidate, hardware) {
        return r;
    }
    if let Some(r) = try_cpu_offload(catalog, candidate, hardware, cascade_config) {
        return r;
    }
    if let Some(r) = try_substitution(catalog, candidate, hardware, user, substitutions) {
        return r;
    }
    if candidate.passing.selected_variant.is_some() || candidate.passing.execution_mode != recommend_core::candidate::ExecutionMode::Cloud {
        return try_workflow_optimization(candidate);
    }
    if let Some(r) = try_cloud(catalog, candidate, user) {
        return r;
    }
    ResolutionResult::unresolved(format!(
        "{} could not be rescued onto this hardware; consider a VRAM upgrade or a smaller model variant",
        candidate.passing.model_id
    ))
}

/// Run the cascade over the top-`top_k` candidates in `ranked` that are
/// flagged `requires_resolution`, in rank order. Returns a map of
/// `model_id -> ResolutionResult` for the candidates the cascade actually
/// touched.
pub fn resolve_top_k(
    catalog: &Catalog,
    ranked: &[RankedCandidate],
    hardware: &HardwareProfile,
    user: &UserProfile,
    cascade_config: &CascadeConfig,
    substitutions: &HashMap<String, Vec<String>>,
) -> HashMap<String, ResolutionResult> {
    ranked
        .iter()
        .filter(|c| c.requires_resolution)
        .take(cascade_config.top_k)
        .map(|c| {
            (
                c.passing.model_id.clone(),
                resolve(catalog, c, hardware, user, cascade_config, substitutions),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::score_candidates;
    use crate::test_fixtures::{flux_entry, laptop_m1_8gb, rtx_3070_64gb_ram, user_image_only};
    use crate::topsis::rank_candidates;
    use recommend_core::candidate::{ExecutionMode, PassingCandidate};
    use recommend_core::config::TopsisWeights;
    use recommend_core::user_profile::Modality;

    fn catalog_with(entry: recommend_core::catalog::CatalogEntry) -> Catalog {
        Catalog::parse(&format!(
            r#"{{"entries": [{}]}}"#,
            serde_json::to_string(&entry).unwrap()
        ))
        .unwrap()
    }

    #[test]
    fn offload_candidate_rescued_by_quantization_downgrade_when_it_fits() {
        let entry = flux_entry();
        let catalog = catalog_with(entry.clone());
        let hardware = rtx_3070_64gb_ram(); // 8GB effective VRAM
        let user = user_image_only();
        let passing = PassingCandidate {
            model_id: entry.id.clone(),
            selected_variant: Some("flux-dev-q4km".into()),
            execution_mode: ExecutionMode::GpuOffload,
        };
        let scored = score_candidates(&[passing], Modality::Image, &catalog, &user);
        let ranked = rank_candidates(
            &scored,
            Modality::Image,
            &catalog,
            &hardware,
            TopsisWeights::default(),
            user.speed_priority,
            None,
        );
        let result = resolve(
            &catalog,
            &ranked[0],
            &hardware,
            &user,
            &CascadeConfig::default(),
            &HashMap::new(),
        );
        assert!(result.viable);
        assert_eq!(result.kind, ResolutionKind::QuantizationDowngrade);
    }

    #[test]
    fn workflow_optimization_always_succeeds_as_a_final_local_fallback() {
        let entry = flux_entry();
        let catalog = catalog_with(entry.clone());
        let hardware = laptop_m1_8gb();
        let user = user_image_only();
        let passing = PassingCandidate {
            model_id: entry.id.clone(),
            selected_variant: Some("flux-dev-fp16".into()),
            execution_mode: ExecutionMode::GpuOffload,
        };
        let scored = score_candidates(&[passing], Modality::Image, &catalog, &user);
        let ranked = rank_candidates(
            &scored,
            Modality::Image,
            &catalog,
            &hardware,
            TopsisWeights::default(),
            user.speed_priority,
            None,
        );
        let result = resolve(
            &catalog,
            &ranked[0],
            &hardware,
            &user,
            &CascadeConfig::default(),
            &HashMap::new(),
        );
        assert!(result.viable);
    }
}
