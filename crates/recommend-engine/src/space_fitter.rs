//! Space fitter (§4.7): greedy packing of the per-modality selections
//! against available storage.
//!
//! Runs once, after every modality's top pick (post-cascade) is known.
//! Priority is supplied by the caller per [`UseCasePriorities`] — lower
//! number is more important — keyed by modality name; a modality absent
//! from the map keeps its position in the input order (§3's "defaults to
//! document order when not supplied").

use recommend_core::candidate::{SelectedModel, SpaceFitResult, UseCasePriorities};
use recommend_core::catalog::Catalog;
use recommend_core::defaults::STORAGE_BUFFER_GB;
use recommend_core::hardware::HardwareProfile;
use recommend_core::user_profile::Modality;

/// One modality's top selection, with the size the space fitter charges
/// against the storage budget.
pub struct Selection {
    pub modality: Modality,
    pub model: SelectedModel,
    pub total_size_gb: f32,
}

/// Pack `selections` against `hardware.storage.free_gb`, dropping the
/// lowest-priority items first when the total (plus buffer) does not fit.
/// Dropped items with a cloud escape move to `cloud_fallback`; the rest are
/// simply not installed and contribute to `space_short_gb`.
pub fn fit_to_space(
    selections: &[Selection],
    catalog: &Catalog,
    hardware: &HardwareProfile,
    priorities: &UseCasePriorities,
) -> SpaceFitResult {
    let total: f32 = selections.iter().map(|s| s.total_size_gb).sum();
    let budget = hardware.storage.free_gb - STORAGE_BUFFER_GB;

    if total <= budget {
        return SpaceFitResult {
            fitted: selections.iter().map(|s| s.model.clone()).collect(),
            cloud_fallback: Vec::new(),
            space_short_gb: 0.0,
        };
    }

    let mut ordered: Vec<(usize, &Selection)> = selections.iter().enumerate().collect();
    ordered.sort_by_key(|(idx, s)| {
        priorities
            .get(s.modality.as_str())
            .copied()
            .unwrap_or(*idx as u32)
    });

    let mut fitted = Vec::new();
    let mut cloud_fallback = Vec::new();
    let mut used = 0.0f32;
    let mut short = 0.0f32;

    for (_, selection) in ordered {
        if used + selection.total_size_gb <= budget.max(0.0) {
            used += selection.total_size_gb;
            fitted.push(selection.model.clone());
            continue;
        }
        let has_cloud = catalog
            .get(&selection.model.model_id)
            .map(|e| e.cloud.available)
            .unwrap_or(false);
        if has_cloud {
            cloud_fallback.push(SelectedModel {
                model_id: selection.model.model_id.clone(),
                variant_id: None,
                execution_mode: recommend_core::candidate::ExecutionMode::Cloud,
            });
        } else {
            short += selection.total_size_gb;
        }
    }

    SpaceFitResult {
        fitted,
        cloud_fallback,
        space_short_gb: short,
    }
}
