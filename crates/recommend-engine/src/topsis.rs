//! Layer 3 — weighted multi-criteria ranking (§4.5).
//!
//! Five criteria (`content_similarity`, `hardware_fit`, `speed_fit`,
//! `ecosystem_maturity`, `approach_fit`) are assembled into a decision
//! matrix, vector-normalized, weighted, and ranked by closeness to the
//! ideal solution — standard TOPSIS. The weight set itself switches when
//! the user's `speed_priority` crosses a configured threshold.

use recommend_core::candidate::{CriteriaScores, PassingCandidate, RankedCandidate, ScoredCandidate};
use recommend_core::catalog::{Catalog, ComputeIntensity, Variant};
use recommend_core::config::TopsisWeights;
use recommend_core::defaults::{TENSORRT_SPEED_BONUS, TOPSIS_EPSILON};
use recommend_core::hardware::{HardwareProfile, Platform};
use recommend_core::user_profile::Modality;

/// §4.5's speed-fit breakpoints, in seconds of estimated load time, mapped
/// to a score. Ordered ascending; the first breakpoint the load time is
/// `<=` to applies.
const SPEED_FIT_BREAKPOINTS: &[(f32, f32)] = &[
    (5.0, 1.0),
    (15.0, 0.8),
    (30.0, 0.6),
    (60.0, 0.4),
    (f32::INFINITY, 0.2),
];

/// Select the weight set to use for this run, based on the user's stated
/// speed priority against the configured switch threshold.
pub fn select_weights(
    speed_priority: f32,
    switch_threshold: f32,
    default_weights: TopsisWeights,
    speed_weights: TopsisWeights,
) -> TopsisWeights {
    if speed_priority >= switch_threshold {
        speed_weights
    } else {
        default_weights
    }
}

/// Resolve the variant a criterion computation should treat as "the"
/// variant for a candidate: the one actually selected by the constraint
/// layer, or (for a pure cloud escape, which selects no local variant) the
/// highest-quality variant declared for the platform, so a cloud candidate
/// still gets a meaningful `hardware_fit` figure instead of a bottomed-out
/// default.
fn representative_variant<'a>(
    catalog: &'a Catalog,
    passing: &PassingCandidate,
    platform: Platform,
) -> Option<&'a Variant> {
    if let Some(variant_id) = &passing.selected_variant {
        let entry = catalog.get(&passing.model_id)?;
        return entry.variants.iter().find(|v| &v.id == variant_id);
    }
    catalog
        .get(&passing.model_id)?
        .variants_for_platform(platform)
        .into_iter()
        .next()
}

/// `hardware_fit` (§4.5): best-variant VRAM fit, then the Apple MPS
/// performance-penalty discount, then the form-factor penalty keyed on
/// compute intensity.
fn hardware_fit(catalog: &Catalog, passing: &PassingCandidate, hardware: &HardwareProfile) -> f32 {
    let Some(entry) = catalog.get(&passing.model_id) else {
        return 0.0;
    };
    let Some(variant) = representative_variant(catalog, passing, hardware.platform) else {
        return 0.0;
    };

    let effective = hardware.effective_vram_gb;
    let min_gb = variant.vram_min_mb as f32 / 1024.0;
    let rec_gb = variant.vram_recommended_mb as f32 / 1024.0;

    let mut fit = if effective >= rec_gb {
        1.0
    } else if rec_gb > min_gb {
        (0.5 + 0.5 * (effective - min_gb) / (rec_gb - min_gb)).clamp(0.0, 1.0)
    } else {
        // vram_min_mb == vram_recommended_mb: binary fit, already known to
        // pass the constraint layer's VRAM check.
        1.0
    };

    if hardware.platform.is_apple_silicon() {
        fit *= 1.0 - entry.capabilities.mps_performance_penalty;
    }

    fit *= match entry.hardware.compute_intensity {
        ComputeIntensity::High => hardware.form_factor.sustained_performance_ratio,
        ComputeIntensity::Medium => {
            (1.0 + hardware.form_factor.sustained_performance_ratio) / 2.0
        }
        ComputeIntensity::Low => 1.0,
    };

    fit.clamp(0.0, 1.0)
}

/// `speed_fit` (§4.5): neutral below the speed-priority threshold; above
/// it, a load-time estimate from download size over storage throughput,
/// with a TensorRT bonus on NVIDIA.
fn speed_fit(
    catalog: &Catalog,
    passing: &PassingCandidate,
    hardware: &HardwareProfile,
    speed_priority: f32,
    neutral_threshold: f32,
    neutral_score: f32,
) -> f32 {
    if speed_priority < neutral_threshold {
        return neutral_score;
    }
    let Some(entry) = catalog.get(&passing.model_id) else {
        return neutral_score;
    };
    let Some(variant) = representative_variant(catalog, passing, hardware.platform) else {
        return neutral_score;
    };

    let load_time_s = variant.download_size_gb * 1024.0 / hardware.storage.read_mbps.max(1.0);
    let mut score = SPEED_FIT_BREAKPOINTS
        .iter()
        .find(|(max_s, _)| load_time_s <= *max_s)
        .map(|(_, s)| *s)
        .unwrap_or(0.2);

    if hardware.platform.is_nvidia() && entry.hardware.supports_tensorrt {
        score = (score + TENSORRT_SPEED_BONUS).min(1.0);
    }
    score
}

/// Normalize a decision-matrix column by its L2 norm; an all-zero column
/// stays all zero rather than dividing by zero.
fn normalize_column(values: &[f32]) -> Vec<f32> {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|v| v / norm).collect()
    }
}

/// Rank the candidates scored for a single modality, producing dense
/// 1-based ranks tie-broken by catalog order.
pub fn rank_candidates(
    scored: &[ScoredCandidate],
    modality: Modality,
    catalog: &Catalog,
    hardware: &HardwareProfile,
    weights: TopsisWeights,
    speed_priority: f32,
    content_similarity_override: Option<&std::collections::HashMap<String, f32>>,
) -> Vec<RankedCandidate> {
    if scored.is_empty() {
        return Vec::new();
    }

    let catalog_order: std::collections::HashMap<&str, usize> = catalog
        .all()
        .enumerate()
        .map(|(i, e)| (e.id.as_str(), i))
        .collect();

    let rows: Vec<[f32; 5]> = scored
        .iter()
        .map(|sc| {
            let content_similarity = content_similarity_override
                .and_then(|idx| idx.get(&sc.passing.model_id).copied())
                .unwrap_or(sc.similarity);
            [
                content_similarity,
                hardware_fit(catalog, &sc.passing, hardware),
                speed_fit(
                    catalog,
                    &sc.passing,
                    hardware,
                    speed_priority,
                    recommend_core::defaults::SPEED_FIT_NEUTRAL_THRESHOLD,
                    recommend_core::defaults::SPEED_FIT_NEUTRAL_SCORE,
                ),
                catalog
                    .get(&sc.passing.model_id)
                    .map(|e| e.capabilities.ecosystem_maturity)
                    .unwrap_or(0.0),
                catalog
                    .get(&sc.passing.model_id)
                    .map(|e| e.capabilities.approach_fit)
                    .unwrap_or(0.0),
            ]
        })
        .collect();

    let weight_arr = weights.as_array();
    let n = rows.len();
    let mut weighted = vec![[0.0f32; 5]; n];
    for col in 0..5 {
        let column: Vec<f32> = rows.iter().map(|r| r[col]).collect();
        let normalized = normalize_column(&column);
        for (row_idx, value) in normalized.into_iter().enumerate() {
            weighted[row_idx][col] = value * weight_arr[col];
        }
    }

    let mut ideal = [f32::MIN; 5];
    let mut anti_ideal = [f32::MAX; 5];
    for row in &weighted {
        for col in 0..5 {
            ideal[col] = ideal[col].max(row[col]);
            anti_ideal[col] = anti_ideal[col].min(row[col]);
        }
    }

    let mut closeness = vec![0.0f32; n];
    for (i, row) in weighted.iter().enumerate() {
        let d_plus: f32 = (0..5).map(|c| (row[c] - ideal[c]).powi(2)).sum::<f32>().sqrt();
        let d_minus: f32 = (0..5)
            .map(|c| (row[c] - anti_ideal[c]).powi(2))
            .sum::<f32>()
            .sqrt();
        closeness[i] = d_minus / (d_plus + d_minus + TOPSIS_EPSILON);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        closeness[b]
            .partial_cmp(&closeness[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let oa = catalog_order
                    .get(scored[a].passing.model_id.as_str())
                    .copied()
                    .unwrap_or(usize::MAX);
                let ob = catalog_order
                    .get(scored[b].passing.model_id.as_str())
                    .copied()
                    .unwrap_or(usize::MAX);
                oa.cmp(&ob)
            })
    });

    order
        .into_iter()
        .enumerate()
        .map(|(rank_idx, i)| {
            let row = weighted[i];
            RankedCandidate {
                passing: scored[i].passing.clone(),
                modality,
                topsis_score: closeness[i].clamp(0.0, 1.0),
                criteria_scores: CriteriaScores {
                    content_similarity: row[0],
                    hardware_fit: row[1],
                    speed_fit: row[2],
                    ecosystem_maturity: row[3],
                    approach_fit: row[4],
                },
                rank: rank_idx + 1,
                matching_features: scored[i].matching_features.clone(),
                missing_features: scored[i].missing_features.clone(),
                requires_resolution: matches!(
                    scored[i].passing.execution_mode,
                    recommend_core::candidate::ExecutionMode::GpuOffload
                        | recommend_core::candidate::ExecutionMode::Cloud
                ),
            }
        })
        .collect()
}
