//! Error types for the recommender core.

use thiserror::Error;

/// Result type alias using the recommender's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for recommender operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Catalog file was malformed or missing required fields.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A single hardware subsystem could not be resolved.
    #[error("Probe failed for {field}: {cause}")]
    ProbeFailed { field: String, cause: String },

    /// Layer 1 left no passing candidates and no cloud escape exists.
    #[error("No viable candidates for modality: {0}")]
    NoViableCandidates(String),

    /// The run was aborted by a cooperative cancellation signal.
    #[error("Recommendation run cancelled")]
    Cancelled,

    /// An internal contract was violated (e.g. negative VRAM). Indicates a bug.
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    /// `RecommenderConfig` was malformed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Catalog(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl Error {
    /// Construct a `ProbeFailed` error for a named hardware field.
    pub fn probe_failed(field: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Error::ProbeFailed {
            field: field.into(),
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_catalog() {
        let err = Error::Catalog("missing variants field".to_string());
        assert_eq!(err.to_string(), "Catalog error: missing variants field");
    }

    #[test]
    fn test_error_display_probe_failed() {
        let err = Error::probe_failed("gpu.vram_gb", "nvidia-smi exited with status 1");
        assert_eq!(
            err.to_string(),
            "Probe failed for gpu.vram_gb: nvidia-smi exited with status 1"
        );
    }

    #[test]
    fn test_error_display_no_viable_candidates() {
        let err = Error::NoViableCandidates("video".to_string());
        assert_eq!(err.to_string(), "No viable candidates for modality: video");
    }

    #[test]
    fn test_error_display_cancelled() {
        let err = Error::Cancelled;
        assert_eq!(err.to_string(), "Recommendation run cancelled");
    }

    #[test]
    fn test_error_display_invariant_violated() {
        let err = Error::InvariantViolated("negative vram".to_string());
        assert_eq!(err.to_string(), "Invariant violated: negative vram");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("weights must sum to 1.0".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: weights must sum to 1.0"
        );
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "catalog.json not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad json}").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Catalog(msg) => assert!(!msg.is_empty()),
            _ => panic!("expected Catalog error"),
        }
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("not = valid = toml").unwrap_err();
        let err: Error = toml_err.into();
        match err {
            Error::Config(_) => {}
            _ => panic!("expected Config error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
