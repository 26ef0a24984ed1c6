//! Layer 2 — modality-scoped content similarity (§4.4).
//!
//! Each modality registers a [`ModalityScorer`] — an ordered list of named
//! dimensions plus two projections (user preferences -> vector, catalog
//! capabilities -> vector) onto those dimensions. Scoring itself is the
//! same for every modality: L2-normalize both vectors and take the cosine
//! similarity. Keeping the per-modality knowledge confined to the two
//! projection functions (rather than an inheritance chain per modality) is
//! what lets §4.8's explainer and this layer share one scoring path.

use std::collections::HashMap;

use recommend_core::candidate::{PassingCandidate, ScoredCandidate};
use recommend_core::catalog::{Capabilities, Catalog};
use recommend_core::user_profile::{ConsistencyNeed, Modality, UserProfile};

/// Threshold above which a dimension counts as a matching feature on both
/// sides (§4.4).
const MATCH_THRESHOLD: f32 = 0.6;
/// User-importance threshold, paired with a low model score, that flags a
/// missing feature (§4.4).
const MISSING_USER_THRESHOLD: f32 = 0.7;
const MISSING_MODEL_THRESHOLD: f32 = 0.3;

/// A modality's named scoring axes and the two vector-building projections
/// onto them.
pub trait ModalityScorer {
    fn dimensions(&self) -> &'static [&'static str];
    fn build_user_vector(&self, user: &UserProfile) -> Vec<f32>;
    fn build_model_vector(&self, capabilities: &Capabilities) -> Vec<f32>;
}

struct ImageScorer;

impl ModalityScorer for ImageScorer {
    fn dimensions(&self) -> &'static [&'static str] {
        &[
            "photorealism",
            "artistic_quality",
            "text_rendering",
            "editability",
            "pose_control",
            "inpainting",
            "instruction_editing",
            "character_consistency",
            "generation_speed",
        ]
    }

    fn build_user_vector(&self, user: &UserProfile) -> Vec<f32> {
        let q = &user.shared_quality;
        let prefs = user.image_prefs.as_ref();
        let photorealism_tagged = prefs
            .map(|p| p.style_tags.contains("photorealism"))
            .unwrap_or(false);
        let photorealism = if photorealism_tagged {
            q.photorealism_norm()
        } else {
            0.5 * q.photorealism_norm()
        };
        let character_consistency = match prefs.map(|p| p.character_consistency) {
            Some(ConsistencyNeed::Essential) => 1.0,
            Some(ConsistencyNeed::Helpful) => 0.5,
            Some(ConsistencyNeed::NotNeeded) | None => 0.0,
        };
        let pose_control = prefs
            .map(|p| if p.pose_control >= 0.5 { 1.0 } else { 0.0 })
            .unwrap_or(0.0);
        vec![
            photorealism,
            q.artistic_stylization_norm(),
            q.output_quality_norm(),
            prefs.map(|p| p.editability).unwrap_or(0.0),
            pose_control,
            prefs.map(|p| p.localized_edits).unwrap_or(0.0),
            prefs.map(|p| p.holistic_edits).unwrap_or(0.0),
            character_consistency,
            q.generation_speed_norm(),
        ]
    }

    fn build_model_vector(&self, capabilities: &Capabilities) -> Vec<f32> {
        let s = &capabilities.scores;
        vec![
            s.photorealism,
            s.artistic_quality,
            s.text_rendering,
            s.editability,
            s.pose_control,
            s.inpainting,
            s.instruction_editing,
            s.consistency,
            s.speed,
        ]
    }
}

struct VideoScorer;

impl ModalityScorer for VideoScorer {
    fn dimensions(&self) -> &'static [&'static str] {
        &[
            "motion_quality",
            "temporal_coherence",
            "photorealism",
            "artistic_quality",
            "generation_speed",
        ]
    }

    fn build_user_vector(&self, user: &UserProfile) -> Vec<f32> {
        let q = &user.shared_quality;
        let video = user.video_prefs.as_ref();
        vec![
            video.map(|v| v.motion_intensity).unwrap_or(0.5),
            video.map(|v| v.temporal_coherence).unwrap_or(0.5),
            q.photorealism_norm(),
            q.artistic_stylization_norm(),
            q.generation_speed_norm(),
        ]
    }

    fn build_model_vector(&self, capabilities: &Capabilities) -> Vec<f32> {
        let s = &capabilities.scores;
        vec![
            s.motion_quality,
            s.temporal_coherence,
            s.photorealism,
            s.artistic_quality,
            s.speed,
        ]
    }
}

struct AudioScorer;

impl ModalityScorer for AudioScorer {
    fn dimensions(&self) -> &'static [&'static str] {
        &["lip_sync", "generation_speed", "consistency"]
    }

    fn build_user_vector(&self, user: &UserProfile) -> Vec<f32> {
        let q = &user.shared_quality;
        let needs_lip_sync = user
            .audio_prefs
            .as_ref()
            .map(|a| a.audio_sync_needs.contains("lip_sync"))
            .unwrap_or(false);
        vec![
            if needs_lip_sync { 1.0 } else { 0.0 },
            q.generation_speed_norm(),
            q.character_consistency_norm(),
        ]
    }

    fn build_model_vector(&self, capabilities: &Capabilities) -> Vec<f32> {
        let s = &capabilities.scores;
        vec![s.lip_sync, s.speed, s.consistency]
    }
}

struct ThreeDScorer;

impl ModalityScorer for ThreeDScorer {
    fn dimensions(&self) -> &'static [&'static str] {
        &["artistic_quality", "consistency", "generation_speed"]
    }

    fn build_user_vector(&self, user: &UserProfile) -> Vec<f32> {
        let q = &user.shared_quality;
        vec![
            q.artistic_stylization_norm(),
            q.character_consistency_norm(),
            q.generation_speed_norm(),
        ]
    }

    fn build_model_vector(&self, capabilities: &Capabilities) -> Vec<f32> {
        let s = &capabilities.scores;
        vec![s.artistic_quality, s.consistency, s.speed]
    }
}

/// Look up the scorer registered for a modality (§9's "register scorers in
/// a map keyed by modality id", kept here as a `match` rather than a
/// runtime-built `HashMap` since the key set is fixed at compile time).
fn scorer_for(modality: Modality) -> &'static dyn ModalityScorer {
    match modality {
        Modality::Image => &ImageScorer,
        Modality::Video => &VideoScorer,
        Modality::Audio => &AudioScorer,
        Modality::ThreeD => &ThreeDScorer,
    }
}

/// L2-normalize `v`, or leave it as all-zeros if its magnitude is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        vec![0.0; v.len()]
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}

/// Cosine similarity between two vectors of equal length. A zero-magnitude
/// vector on either side yields `0.0`, never `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_normalize(a);
    let nb = l2_normalize(b);
    if na.iter().all(|x| *x == 0.0) || nb.iter().all(|x| *x == 0.0) {
        return 0.0;
    }
    na.iter().zip(nb.iter()).map(|(x, y)| x * y).sum()
}

/// Score one candidate against the user in one modality, returning the
/// similarity plus matching/missing feature names for the explainer.
fn score_one(
    scorer: &dyn ModalityScorer,
    capabilities: &Capabilities,
    user: &UserProfile,
) -> (f32, Vec<String>, Vec<String>) {
    let user_vec = scorer.build_user_vector(user);
    let model_vec = scorer.build_model_vector(capabilities);
    let similarity = cosine_similarity(&user_vec, &model_vec);

    let mut matching = Vec::new();
    let mut missing = Vec::new();
    for (i, dim) in scorer.dimensions().iter().enumerate() {
        let u = user_vec[i];
        let m = model_vec[i];
        if u >= MATCH_THRESHOLD && m >= MATCH_THRESHOLD {
            matching.push(dim.to_string());
        }
        if u >= MISSING_USER_THRESHOLD && m <= MISSING_MODEL_THRESHOLD {
            missing.push(dim.to_string());
        }
    }
    (similarity, matching, missing)
}

/// Score every passing candidate against `user`, scoped to `modality`. A
/// candidate scores in a modality only if it declares that modality as a
/// primary capability (the catalog entry lookup is how we find that).
pub fn score_candidates(
    passing: &[PassingCandidate],
    modality: Modality,
    catalog: &Catalog,
    user: &UserProfile,
) -> Vec<ScoredCandidate> {
    let scorer = scorer_for(modality);
    passing
        .iter()
        .filter_map(|p| {
            let entry = catalog.get(&p.model_id)?;
            if !entry.capabilities.primary.contains(&modality) {
                return None;
            }
            let (similarity, matching_features, missing_features) =
                score_one(scorer, &entry.capabilities, user);
            Some(ScoredCandidate {
                passing: p.clone(),
                modality,
                similarity,
                matching_features,
                missing_features,
            })
        })
        .collect()
}

/// The blended content-similarity score for a candidate that serves more
/// than one modality the user requested (§4.4's closing paragraph): the
/// mean of its per-modality similarities, one term per modality the
/// candidate both serves and the user selected. For a single-modality
/// candidate this is just that modality's similarity.
///
/// This is an explicit resolution of an under-specified weighting rule —
/// see DESIGN.md — since the spec describes weights "proportional to the
/// number of ... modalities" without naming per-modality weights, which a
/// uniform mean satisfies.
pub fn blended_content_similarity(
    entry_capabilities: &Capabilities,
    requested_modalities: &[Modality],
    user: &UserProfile,
) -> f32 {
    let terms: Vec<f32> = entry_capabilities
        .primary
        .iter()
        .filter(|m| requested_modalities.contains(m))
        .map(|m| {
            let scorer = scorer_for(*m);
            let (similarity, _, _) = score_one(scorer, entry_capabilities, user);
            similarity
        })
        .collect();
    if terms.is_empty() {
        0.0
    } else {
        terms.iter().sum::<f32>() / terms.len() as f32
    }
}

/// Build a lookup of `model_id -> blended content similarity`, used by the
/// TOPSIS layer so it does not need to re-run the content layer per
/// modality for multi-modal candidates.
pub fn blended_similarity_index(
    passing: &[PassingCandidate],
    requested_modalities: &[Modality],
    catalog: &Catalog,
    user: &UserProfile,
) -> HashMap<String, f32> {
    passing
        .iter()
        .filter_map(|p| {
            let entry = catalog.get(&p.model_id)?;
            Some((
                p.model_id.clone(),
                blended_content_similarity(&entry.capabilities, requested_modalities, user),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{flux_entry, user_image_only};

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero_not_nan() {
        let zero = vec![0.0, 0.0, 0.0];
        let other = vec![0.5, 0.5, 0.5];
        assert_eq!(cosine_similarity(&zero, &other), 0.0);
        assert!(!cosine_similarity(&zero, &other).is_nan());
    }

    #[test]
    fn image_scorer_rewards_photorealism_tagged_models() {
        let entry = flux_entry();
        let user = user_image_only();
        let (similarity, matching, _) = score_one(&ImageScorer, &entry.capabilities, &user);
        assert!(similarity > 0.0);
        assert!(matching.contains(&"photorealism".to_string()));
    }

    #[test]
    fn score_candidates_filters_to_declared_primary_modality() {
        let entry = flux_entry();
        let catalog = Catalog::parse(&format!(
            r#"{{"entries": [{}]}}"#,
            serde_json::to_string(&entry).unwrap()
        ))
        .unwrap();
        let passing = vec![PassingCandidate {
            model_id: entry.id.clone(),
            selected_variant: Some("flux-dev-fp16".into()),
            execution_mode: recommend_core::candidate::ExecutionMode::GpuNative,
        }];
        let user = user_image_only();
        let image_scores = score_candidates(&passing, Modality::Image, &catalog, &user);
        assert_eq!(image_scores.len(), 1);
        let video_scores = score_candidates(&passing, Modality::Video, &catalog, &user);
        assert!(video_scores.is_empty());
    }

    #[test]
    fn missing_feature_flagged_when_user_wants_it_and_model_lacks_it() {
        let mut entry = flux_entry();
        entry.capabilities.scores.pose_control = 0.1;
        let mut user = user_image_only();
        if let Some(prefs) = user.image_prefs.as_mut() {
            prefs.pose_control = 0.9;
        }
        let (_, _, missing) = score_one(&ImageScorer, &entry.capabilities, &user);
        assert!(missing.contains(&"pose_control".to_string()));
    }
}
