//! Intermediate and result types threaded between pipeline stages (§3).
//!
//! Every candidate-shaped type here references catalog entries by id —
//! nothing in the pipeline mutates or owns a copy of the catalog itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hardware::Platform;
use crate::user_profile::Modality;

/// Why a Layer 1 constraint check rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Vram,
    Ram,
    Storage,
    Platform,
    ComputeCapability,
    StorageSpace,
    Incompat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionReason {
    pub model_id: String,
    pub constraint: Constraint,
    pub detail: String,
    pub required: f32,
    pub available: f32,
}

/// How a passing candidate will actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    GpuNative,
    GpuOffload,
    Cloud,
}

/// A catalog entry that cleared Layer 1, with the variant it will run
/// (`None` for a pure cloud-escape candidate — no local weights are
/// selected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassingCandidate {
    pub model_id: String,
    pub selected_variant: Option<String>,
    pub execution_mode: ExecutionMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub passing: PassingCandidate,
    pub modality: Modality,
    pub similarity: f32,
    pub matching_features: Vec<String>,
    pub missing_features: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaScores {
    pub content_similarity: f32,
    pub hardware_fit: f32,
    pub speed_fit: f32,
    pub ecosystem_maturity: f32,
    pub approach_fit: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub passing: PassingCandidate,
    pub modality: Modality,
    pub topsis_score: f32,
    pub criteria_scores: CriteriaScores,
    pub rank: usize,
    /// Matching/missing feature names carried over from §4.4, retained so
    /// the explainer does not need to re-run the content layer.
    pub matching_features: Vec<String>,
    pub missing_features: Vec<String>,
    /// Set by the orchestrator when this candidate did not fit natively
    /// and was rescued onto a marginal execution mode, flagging it for
    /// the resolution cascade.
    pub requires_resolution: bool,
}

/// Which cascade rescue (if any) was applied to a marginal candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    None,
    QuantizationDowngrade,
    CpuOffload,
    Substitution,
    WorkflowOptimization,
    Cloud,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub viable: bool,
    pub kind: ResolutionKind,
    pub selected_variant: Option<String>,
    pub substituted_model_id: Option<String>,
    pub performance_factor: f32,
    pub quality_impact: String,
    /// Present only when `viable` is false: actionable guidance (e.g. a
    /// recommended VRAM upgrade target).
    pub message: Option<String>,
}

impl ResolutionResult {
    pub fn unresolved(message: impl Into<String>) -> Self {
        Self {
            viable: false,
            kind: ResolutionKind::None,
            selected_variant: None,
            substituted_model_id: None,
            performance_factor: 0.0,
            quality_impact: String::new(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareWarning {
    pub warning_type: String,
    pub severity: WarningSeverity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// A single selection's explanation sections (§4.8).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationExplanation {
    pub selection_summary: String,
    pub hardware_fit: String,
    pub matching_features: Vec<String>,
    pub missing_features: Vec<String>,
    pub resolution_trace: Option<String>,
    pub competing_rejections: Vec<RejectionReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedModel {
    pub model_id: String,
    pub variant_id: Option<String>,
    pub execution_mode: ExecutionMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub selected: Vec<SelectedModel>,
    pub total_size_gb: f32,
    pub estimated_install_minutes: f32,
}

/// Cloud-only plans for models dropped by the space fitter because their
/// local footprint no longer fits, but which have a cloud escape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceFitResult {
    pub fitted: Vec<SelectedModel>,
    pub cloud_fallback: Vec<SelectedModel>,
    pub space_short_gb: f32,
}

/// Stable public contract returned by `recommend()` (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub per_modality_rankings: HashMap<Modality, Vec<RankedCandidate>>,
    pub manifest: InstallManifest,
    pub warnings: Vec<HardwareWarning>,
    pub reasoning: HashMap<String, RecommendationExplanation>,
    pub rejections: Vec<RejectionReason>,
}

/// Caller-supplied use-case priorities for the space fitter (lower number
/// = more important). Defaults to document order when not supplied.
pub type UseCasePriorities = HashMap<String, u32>;

/// Platform ineligibility baked into the catalog (e.g. HunyuanVideo
/// excluded from Apple Silicon). Kept here (not in `catalog.rs`) since it
/// is consumed purely by the constraint layer, not by catalog indexing.
pub fn platform_incompatible(incompatibilities: &[Platform], platform: Platform) -> bool {
    incompatibilities.contains(&platform)
}
