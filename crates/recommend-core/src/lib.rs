//! # recommend-core
//!
//! Hardware profiling, the declarative model catalog, and the shared
//! intermediate/result types for the desktop AI workstation configurator's
//! model recommender. This crate holds the data model (§3) and the
//! platform-specific hardware probe (§4.1); the three-layer decision
//! pipeline that consumes them lives in `recommend-engine`.

pub mod candidate;
pub mod catalog;
pub mod command;
pub mod config;
pub mod defaults;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod schema;
pub mod user_profile;

pub use candidate::{
    Constraint, CriteriaScores, ExecutionMode, HardwareWarning, InstallManifest,
    PassingCandidate, RankedCandidate, RecommendationExplanation, RecommendationResult,
    RejectionReason, ResolutionKind, ResolutionResult, ScoredCandidate, SelectedModel,
    SpaceFitResult, UseCasePriorities, WarningSeverity,
};
pub use catalog::{Catalog, CatalogEntry, CatalogWarning, GgufQuant, Precision, Variant};
pub use command::{first_json_value, first_number, CommandRunner, SystemCommandRunner};
pub use config::RecommenderConfig;
pub use error::{Error, Result};
pub use hardware::{detect, CapacityTier, GpuVendor, HardwareProfile, Platform};
pub use user_profile::{CloudWillingness, Modality, TechnicalLevel, UserProfile};
