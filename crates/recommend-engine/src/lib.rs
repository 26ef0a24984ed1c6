//! # recommend-engine
//!
//! The three-layer decision pipeline (constraint satisfaction, content
//! similarity, TOPSIS ranking) plus the resolution cascade, space fitter
//! and explainer that together implement [`recommend`]. `recommend-core`
//! owns the data model and hardware probe; everything here is pure,
//! synchronous decision logic over that data.

pub mod cascade;
pub mod constraint;
pub mod content;
pub mod explainer;
pub mod space_fitter;
pub mod topsis;

#[cfg(test)]
mod test_fixtures;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use recommend_core::candidate::{
    InstallManifest, RecommendationResult, RejectionReason, ResolutionResult, SelectedModel,
    UseCasePriorities,
};
use recommend_core::catalog::Catalog;
use recommend_core::config::RecommenderConfig;
use recommend_core::error::{Error, Result};
use recommend_core::hardware::HardwareProfile;
use recommend_core::user_profile::{Modality, UserProfile};

use crate::space_fitter::Selection;

/// Cooperative cancellation signal, polled at stage boundaries (§5).
/// Cloned cheaply and shared between the caller and a running
/// `recommend()` call.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Family-level substitution candidates for the cascade's step 3,
/// consulted in listed order. Not part of the catalog schema — callers
/// that want a substitution table supply one explicitly (see DESIGN.md).
pub type SubstitutionMap = HashMap<String, Vec<String>>;

/// Run the full recommendation pipeline for every modality the user has
/// selected, returning the stable public `RecommendationResult` contract
/// (§6).
#[instrument(skip_all)]
pub fn recommend(
    user: &UserProfile,
    hardware: &HardwareProfile,
    catalog: &Catalog,
    config: &RecommenderConfig,
    use_case_priorities: Option<&UseCasePriorities>,
    substitutions: Option<&SubstitutionMap>,
    cancellation: Option<&CancellationToken>,
) -> Result<RecommendationResult> {
    let run_id = Uuid::now_v7();
    let empty_priorities = UseCasePriorities::new();
    let priorities = use_case_priorities.unwrap_or(&empty_priorities);
    let empty_subs = SubstitutionMap::new();
    let substitutions = substitutions.unwrap_or(&empty_subs);

    let weights = topsis::select_weights(
        user.speed_priority,
        config.speed_priority_weight_switch,
        config.topsis_weights,
        config.topsis_weights_speed_priority,
    );

    let mut requested_modalities: Vec<Modality> = user.required_modalities().into_iter().collect();
    requested_modalities.sort();
    let mut per_modality_rankings = HashMap::new();
    let mut all_rejections = Vec::new();
    let mut resolutions: HashMap<String, ResolutionResult> = HashMap::new();
    let mut selections = Vec::new();

    for modality in &requested_modalities {
        if cancellation.map(|c| c.is_cancelled()).unwrap_or(false) {
            return Err(Error::Cancelled);
        }

        let entries = catalog.candidates_for(*modality);
        debug!(
            subsystem = "constraint",
            op = "filter_candidates",
            modality = modality.as_str(),
            candidate_count = entries.len(),
        );
        let (passing, rejections) = constraint::filter_candidates(&entries, hardware, user);
        info!(
            subsystem = "constraint",
            modality = modality.as_str(),
            passing_count = passing.len(),
            rejection_count = rejections.len(),
        );
        all_rejections.extend(rejections.clone());

        if passing.is_empty() {
            continue;
        }

        let content_index =
            content::blended_similarity_index(&passing, &requested_modalities, catalog, user);
        let scored = content::score_candidates(&passing, *modality, catalog, user);
        let ranked = topsis::rank_candidates(
            &scored,
            *modality,
            catalog,
            hardware,
            weights,
            user.speed_priority,
            Some(&content_index),
        );

        let resolved_for_modality =
            cascade::resolve_top_k(catalog, &ranked, hardware, user, &config.cascade, substitutions);
        for (model_id, result) in &resolved_for_modality {
            resolutions.insert(model_id.clone(), result.clone());
        }

        if let Some(top) = ranked.first() {
            let entry = catalog.get(&top.passing.model_id);
            let resolution = resolutions.get(&top.passing.model_id);
            let (variant_id, execution_mode) = match resolution {
                Some(r) if r.viable => (r.selected_variant.clone(), resolution_execution_mode(r, top)),
                _ => (top.passing.selected_variant.clone(), top.passing.execution_mode),
            };
            selections.push(Selection {
                modality: *modality,
                model: SelectedModel {
                    model_id: top.passing.model_id.clone(),
                    variant_id,
                    execution_mode,
                },
                total_size_gb: entry.map(|e| e.hardware.total_size_gb).unwrap_or(0.0),
            });
        }

        per_modality_rankings.insert(*modality, ranked);
    }

    if cancellation.map(|c| c.is_cancelled()).unwrap_or(false) {
        return Err(Error::Cancelled);
    }

    let space_result = space_fitter::fit_to_space(&selections, catalog, hardware, priorities);
    let total_size_gb: f32 = space_result
        .fitted
        .iter()
        .filter_map(|s| catalog.get(&s.model_id))
        .map(|e| e.hardware.total_size_gb)
        .sum();
    let manifest = InstallManifest {
        estimated_install_minutes: estimate_install_minutes(total_size_gb, hardware),
        total_size_gb,
        selected: space_result.fitted.clone(),
    };

    let largest_selected_size_gb = space_result
        .fitted
        .iter()
        .filter_map(|s| catalog.get(&s.model_id))
        .map(|e| e.hardware.total_size_gb)
        .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))));

    let all_ranked: Vec<_> = per_modality_rankings.values().flatten().cloned().collect();
    let warnings = explainer::hardware_warnings(
        catalog,
        hardware,
        &all_ranked,
        &resolutions,
        largest_selected_size_gb,
        user.speed_priority,
    );

    let mut reasoning = HashMap::new();
    for ranked in per_modality_rankings.values() {
        if let Some(top) = ranked.first() {
            let resolution = resolutions.get(&top.passing.model_id);
            let same_modality_rejections: Vec<RejectionReason> = all_rejections
                .iter()
                .filter(|r| catalog.get(&r.model_id).is_some())
                .cloned()
                .collect();
            reasoning.insert(
                top.passing.model_id.clone(),
                explainer::explain_candidate(
                    catalog,
                    top,
                    resolution,
                    &same_modality_rejections,
                    hardware,
                ),
            );
        }
    }

    info!(
        run_id = %run_id,
        modalities = requested_modalities.len(),
        selected = manifest.selected.len(),
        "recommendation run complete",
    );

    Ok(RecommendationResult {
        id: run_id.to_string(),
        timestamp: chrono::Utc::now(),
        per_modality_rankings,
        manifest,
        warnings,
        reasoning,
        rejections: all_rejections,
    })
}

fn resolution_execution_mode(
    result: &ResolutionResult,
    fallback: &recommend_core::candidate::RankedCandidate,
) -> recommend_core::candidate::ExecutionMode {
    use recommend_core::candidate::{ExecutionMode, ResolutionKind};
    match result.kind {
        ResolutionKind::Cloud => ExecutionMode::Cloud,
        ResolutionKind::CpuOffload => ExecutionMode::GpuOffload,
        _ => fallback.passing.execution_mode,
    }
}

/// Rough install-time estimate from total download size over storage
/// write throughput; read throughput is used as a stand-in since the
/// probe does not separately measure write speed (see DESIGN.md).
fn estimate_install_minutes(total_size_gb: f32, hardware: &HardwareProfile) -> f32 {
    if total_size_gb <= 0.0 {
        return 0.0;
    }
    (total_size_gb * 1024.0) / hardware.storage.read_mbps.max(1.0) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        animatediff_entry, desktop_4090, flux_entry, user_image_and_video, user_image_only,
    };

    fn catalog_with(entry: recommend_core::catalog::CatalogEntry) -> Catalog {
        catalog_with_entries(&[entry])
    }

    fn catalog_with_entries(entries: &[recommend_core::catalog::CatalogEntry]) -> Catalog {
        let entries_json: Vec<String> =
            entries.iter().map(|e| serde_json::to_string(e).unwrap()).collect();
        Catalog::parse(&format!(r#"{{"entries": [{}]}}"#, entries_json.join(","))).unwrap()
    }

    #[test]
    fn recommend_end_to_end_produces_a_top_selection() {
        let entry = flux_entry();
        let catalog = catalog_with(entry.clone());
        let hardware = desktop_4090();
        let user = user_image_only();
        let config = RecommenderConfig::default();

        let result = recommend(&user, &hardware, &catalog, &config, None, None, None).unwrap();

        assert!(result.per_modality_rankings.contains_key(&Modality::Image));
        assert_eq!(result.manifest.selected.len(), 1);
        assert_eq!(result.manifest.selected[0].model_id, entry.id);
        assert!(result.reasoning.contains_key(&entry.id));
    }

    #[test]
    fn cancellation_before_any_modality_aborts_the_run() {
        let entry = flux_entry();
        let catalog = catalog_with(entry);
        let hardware = desktop_4090();
        let user = user_image_only();
        let config = RecommenderConfig::default();
        let token = CancellationToken::new();
        token.cancel();

        let result = recommend(&user, &hardware, &catalog, &config, None, None, Some(&token));
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn determinism_same_inputs_produce_identical_rankings() {
        let entry = flux_entry();
        let catalog = catalog_with(entry);
        let hardware = desktop_4090();
        let user = user_image_only();
        let config = RecommenderConfig::default();

        let first = recommend(&user, &hardware, &catalog, &config, None, None, None).unwrap();
        let second = recommend(&user, &hardware, &catalog, &config, None, None, None).unwrap();

        assert_eq!(
            first.per_modality_rankings.get(&Modality::Image).map(|r| r.len()),
            second.per_modality_rankings.get(&Modality::Image).map(|r| r.len())
        );
        assert_eq!(first.manifest.selected, second.manifest.selected);
    }

    #[test]
    fn determinism_holds_for_a_multi_modality_user() {
        // `required_modalities()` returns a HashSet, whose iteration order
        // varies run to run by construction; the orchestrator must sort it
        // before it drives `selections` push order, or `manifest.selected`
        // would be nondeterministic across these two calls.
        let catalog = catalog_with_entries(&[flux_entry(), animatediff_entry()]);
        let hardware = desktop_4090();
        let user = user_image_and_video();
        let config = RecommenderConfig::default();

        let first = recommend(&user, &hardware, &catalog, &config, None, None, None).unwrap();
        let second = recommend(&user, &hardware, &catalog, &config, None, None, None).unwrap();

        assert_eq!(first.manifest.selected.len(), 2);
        assert_eq!(first.manifest.selected, second.manifest.selected);
    }
}
