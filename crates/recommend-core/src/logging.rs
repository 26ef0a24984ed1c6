//! Structured logging schema and field name constants for the recommender core.
//!
//! All crates use these constants for consistent structured logging fields.
//! This ensures log aggregation tools (Loki, Elasticsearch) can correlate a
//! single `recommend()` call across pipeline stages by standardized field
//! names.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (probe completion, run completion) |
//! | DEBUG | Decision points, intermediate values, weight choices |
//! | TRACE | Per-candidate iteration, high-volume scoring data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across a single `recommend()` run.
/// Format: UUIDv7 (time-ordered), matches `RecommendationResult.id`.
pub const RUN_ID: &str = "run_id";

/// Subsystem originating the log event.
/// Values: "probe", "catalog", "constraint", "content", "topsis", "cascade",
/// "space_fitter", "explainer".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "nvidia", "apple_silicon", "image_scorer", "command_runner".
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "detect", "filter_candidates", "rank_candidates", "resolve".
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Catalog model ID being processed.
pub const MODEL_ID: &str = "model_id";

/// Modality being scored or ranked ("image", "video", "audio", "3d").
pub const MODALITY: &str = "modality";

/// Hardware field a probe step is resolving ("gpu", "ram", "storage", "cpu").
pub const PROBE_FIELD: &str = "probe_field";

/// Subprocess command invoked by the probe (e.g. "nvidia-smi").
pub const COMMAND: &str = "command";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of catalog entries considered at the start of a stage.
pub const CANDIDATE_COUNT: &str = "candidate_count";

/// Number of candidates that passed Layer 1 (constraint) filtering.
pub const PASSING_COUNT: &str = "passing_count";

/// Number of candidates rejected by Layer 1, with structured reasons.
pub const REJECTION_COUNT: &str = "rejection_count";

/// TOPSIS closeness coefficient for a ranked candidate.
pub const TOPSIS_SCORE: &str = "topsis_score";

/// Cosine similarity score produced by the content layer.
pub const SIMILARITY: &str = "similarity";

/// Resolution cascade stage that succeeded (or `"none"`).
pub const RESOLUTION_KIND: &str = "resolution_kind";

/// Effective VRAM in GB used for a constraint or fit computation.
pub const EFFECTIVE_VRAM_GB: &str = "effective_vram_gb";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Severity of a synthesized `HardwareWarning` ("info", "warning", "error").
pub const WARNING_SEVERITY: &str = "warning_severity";
