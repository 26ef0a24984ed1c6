//! Explainer (§4.8): human-readable reasoning per recommendation plus
//! cross-cutting hardware warnings.
//!
//! Nothing here changes a decision already made upstream — this module
//! only narrates it. Callers that want the raw numbers already have them
//! on `RankedCandidate`/`ResolutionResult`; this is prose for the wizard.

use recommend_core::candidate::{
    ExecutionMode, HardwareWarning, RankedCandidate, RecommendationExplanation, RejectionReason,
    ResolutionKind, ResolutionResult, WarningSeverity,
};
use recommend_core::catalog::Catalog;
use recommend_core::hardware::{HardwareProfile, StorageTier};

const MIN_LAPTOP_SUSTAINED_RATIO: f32 = 0.8;
const MIN_USABLE_OFFLOAD_GB_FOR_WARNING: f32 = 16.0;
const SPEED_PRIORITY_WARNING_THRESHOLD: f32 = 0.7;
const TOP_COMPETING_REJECTIONS: usize = 3;

fn resolution_trace(resolution: Option<&ResolutionResult>) -> Option<String> {
    let r = resolution?;
    if r.kind == ResolutionKind::None {
        return None;
    }
    Some(match r.kind {
        ResolutionKind::QuantizationDowngrade => format!(
            "downgraded to a lighter-precision variant ({})",
            r.quality_impact
        ),
        ResolutionKind::CpuOffload => format!(
            "offloaded to CPU RAM, running at roughly {:.0}% of native speed",
            r.performance_factor * 100.0
        ),
        ResolutionKind::Substitution => format!(
            "substituted with {} from the same family",
            r.substituted_model_id.as_deref().unwrap_or("a related model")
        ),
        ResolutionKind::WorkflowOptimization => {
            r.message.clone().unwrap_or_else(|| "workflow adjustments suggested".to_string())
        }
        ResolutionKind::Cloud => format!(
            "routed to cloud inference{}",
            r.message.as_ref().map(|m| format!(" ({m})")).unwrap_or_default()
        ),
        ResolutionKind::None => unreachable!(),
    })
}

fn hardware_fit_note(catalog: &Catalog, candidate: &RankedCandidate, hardware: &HardwareProfile) -> String {
    let Some(entry) = catalog.get(&candidate.passing.model_id) else {
        return String::new();
    };
    match candidate.passing.execution_mode {
        ExecutionMode::Cloud => "runs remotely; no local VRAM required".to_string(),
        ExecutionMode::GpuOffload => format!(
            "{:.1} GB effective VRAM is below {}'s native requirement; part of the model is offloaded to system RAM",
            hardware.effective_vram_gb, entry.name
        ),
        ExecutionMode::GpuNative => format!(
            "{:.1} GB effective VRAM comfortably covers {}'s requirement",
            hardware.effective_vram_gb, entry.name
        ),
    }
}

fn selection_summary(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    resolution: Option<&ResolutionResult>,
) -> String {
    let name = catalog
        .get(&candidate.passing.model_id)
        .map(|e| e.name.as_str())
        .unwrap_or(&candidate.passing.model_id);
    match resolution.map(|r| r.kind) {
        Some(kind) if kind != ResolutionKind::None => {
            format!("{name} selected (rank {}, resolved via {kind:?})", candidate.rank)
        }
        _ => format!("{name} selected as the top match (rank {})", candidate.rank),
    }
}

/// Competing rejections for the same modality, ranked by the constraint
/// that tends to matter most to a user reading the "why not" list (VRAM
/// first, since it's the most actionable), truncated to the top 3.
fn competing_rejections(rejections: &[RejectionReason]) -> Vec<RejectionReason> {
    let mut sorted = rejections.to_vec();
    sorted.sort_by_key(|r| match r.constraint {
        recommend_core::candidate::Constraint::Vram => 0,
        recommend_core::candidate::Constraint::ComputeCapability => 1,
        recommend_core::candidate::Constraint::Ram => 2,
        recommend_core::candidate::Constraint::StorageSpace => 3,
        recommend_core::candidate::Constraint::Storage => 3,
        recommend_core::candidate::Constraint::Platform => 4,
        recommend_core::candidate::Constraint::Incompat => 5,
    });
    sorted.truncate(TOP_COMPETING_REJECTIONS);
    sorted
}

/// Build the explanation for one selected candidate.
pub fn explain_candidate(
    catalog: &Catalog,
    candidate: &RankedCandidate,
    resolution: Option<&ResolutionResult>,
    rejections: &[RejectionReason],
    hardware: &HardwareProfile,
) -> RecommendationExplanation {
    RecommendationExplanation {
        selection_summary: selection_summary(catalog, candidate, resolution),
        hardware_fit: hardware_fit_note(catalog, candidate, hardware),
        matching_features: candidate.matching_features.clone(),
        missing_features: candidate.missing_features.clone(),
        resolution_trace: resolution_trace(resolution),
        competing_rejections: competing_rejections(rejections),
    }
}

/// Cross-cutting hardware warnings (§4.8), independent of any single
/// candidate.
pub fn hardware_warnings(
    catalog: &Catalog,
    hardware: &HardwareProfile,
    selected: &[RankedCandidate],
    resolutions: &std::collections::HashMap<String, ResolutionResult>,
    largest_selected_size_gb: Option<f32>,
    speed_priority: f32,
) -> Vec<HardwareWarning> {
    let mut warnings = Vec::new();

    if hardware.form_factor.is_laptop && hardware.form_factor.sustained_performance_ratio < MIN_LAPTOP_SUSTAINED_RATIO {
        warnings.push(HardwareWarning {
            warning_type: "laptop_sustained_performance".to_string(),
            severity: WarningSeverity::Info,
            title: "Sustained performance below desktop levels".to_string(),
            message: format!(
                "this laptop's power limit caps sustained throughput to about {:.0}% of the reference desktop GPU",
                hardware.form_factor.sustained_performance_ratio * 100.0
            ),
            suggestions: vec![],
        });
    }

    if hardware.storage.tier == StorageTier::Slow && speed_priority >= SPEED_PRIORITY_WARNING_THRESHOLD {
        if let Some(size_gb) = largest_selected_size_gb {
            let load_time_s = size_gb * 1024.0 / hardware.storage.read_mbps.max(1.0);
            warnings.push(HardwareWarning {
                warning_type: "slow_storage".to_string(),
                severity: WarningSeverity::Warning,
                title: "Storage speed will noticeably affect load time".to_string(),
                message: format!(
                    "estimated {load_time_s:.0}s to load the largest selected model from this storage tier"
                ),
                suggestions: vec!["consider moving the model cache to faster storage".to_string()],
            });
        }
    }

    for candidate in selected {
        if candidate.passing.execution_mode == ExecutionMode::GpuOffload {
            let factor = resolutions
                .get(&candidate.passing.model_id)
                .map(|r| r.performance_factor)
                .unwrap_or(1.0);
            warnings.push(HardwareWarning {
                warning_type: "gpu_offload".to_string(),
                severity: WarningSeverity::Info,
                title: format!("{} runs with CPU offload", candidate.passing.model_id),
                message: format!("expect roughly {:.0}% of native speed", factor * 100.0),
                suggestions: vec![],
            });

            if hardware.ram.usable_for_offload_gb < MIN_USABLE_OFFLOAD_GB_FOR_WARNING {
                warnings.push(HardwareWarning {
                    warning_type: "low_offload_headroom".to_string(),
                    severity: WarningSeverity::Warning,
                    title: "Limited RAM for CPU offload".to_string(),
                    message: format!(
                        "only {:.1} GB of RAM is usable for offloaded layers",
                        hardware.ram.usable_for_offload_gb
                    ),
                    suggestions: vec!["close other memory-heavy applications while generating".to_string()],
                });
            }
        }
    }

    if !hardware.cpu.supports_avx2 {
        let has_gguf_selection = selected.iter().any(|c| {
            let variant_id = resolutions
                .get(&c.passing.model_id)
                .and_then(|r| r.selected_variant.as_ref())
                .or(c.passing.selected_variant.as_ref());
            let Some(variant_id) = variant_id else {
                return false;
            };
            catalog
                .get(&c.passing.model_id)
                .and_then(|e| e.variants.iter().find(|v| &v.id == variant_id))
                .map(|v| matches!(v.precision, recommend_core::catalog::Precision::Gguf(_)))
                .unwrap_or(false)
        });
        if has_gguf_selection {
            warnings.push(HardwareWarning {
                warning_type: "gguf_without_avx2".to_string(),
                severity: WarningSeverity::Warning,
                title: "GGUF inference without AVX2".to_string(),
                message: "this CPU lacks AVX2, which GGUF kernels rely on for acceptable throughput".to_string(),
                suggestions: vec![],
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::score_candidates;
    use crate::test_fixtures::{desktop_4090, flux_entry, laptop_4090_175w, user_image_only};
    use crate::topsis::rank_candidates;
    use recommend_core::candidate::{ExecutionMode, PassingCandidate};
    use recommend_core::config::TopsisWeights;
    use recommend_core::user_profile::Modality;
    use std::collections::HashMap;

    fn catalog_with(entry: recommend_core::catalog::CatalogEntry) -> Catalog {
        Catalog::parse(&format!(
            r#"{{"entries": [{}]}}"#,
            serde_json::to_string(&entry).unwrap()
        ))
        .unwrap()
    }

    #[test]
    fn explanation_names_the_model_and_carries_features() {
        let entry = flux_entry();
        let catalog = catalog_with(entry.clone());
        let hardware = desktop_4090();
        let user = user_image_only();
        let passing = PassingCandidate {
            model_id: entry.id.clone(),
            selected_variant: Some("flux-dev-fp16".into()),
            execution_mode: ExecutionMode::GpuNative,
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
        let explanation = explain_candidate(&catalog, &ranked[0], None, &[], &hardware);
        assert!(explanation.selection_summary.contains("Flux.1 Dev"));
    }

    #[test]
    fn laptop_below_sustained_ratio_threshold_gets_info_warning() {
        let hardware = laptop_4090_175w();
        let catalog = catalog_with(flux_entry());
        let warnings = hardware_warnings(&catalog, &hardware, &[], &HashMap::new(), None, 0.4);
        assert!(warnings.iter().any(|w| w.warning_type == "laptop_sustained_performance"));
    }
}
