//! Recommender configuration system.
//!
//! Mirrors the host project's `InferenceConfig` pattern: a TOML file
//! (default `./recommend.toml`, or the path named by `RECOMMEND_CONFIG`)
//! provides the base values, environment variables prefixed `RECOMMEND_`
//! override individual fields, and anything left unset falls back to the
//! defaults in [`crate::defaults`]. Validation happens once, at load time
//! — nothing downstream re-checks weight sums or timeout bounds.
//!
//! ```rust,no_run
//! use recommend_core::config::RecommenderConfig;
//!
//! // Load from default path or fall back to env vars / defaults.
//! let config = RecommenderConfig::load().expect("failed to load config");
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults::{
    CASCADE_TOP_K_DEFAULT, CATALOG_PATH_DEFAULT, CONFIG_PATH_DEFAULT, CONFIG_PATH_ENV_VAR,
    OFFLOAD_SLOWDOWN_HIGH_DEFAULT, OFFLOAD_SLOWDOWN_MEDIUM_DEFAULT, PROBE_TIMEOUT_SECS_DEFAULT,
    SPEED_PRIORITY_WEIGHT_SWITCH, TOPSIS_WEIGHTS_DEFAULT, TOPSIS_WEIGHTS_SPEED_PRIORITY,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// The five TOPSIS criteria weights, in the fixed order content_similarity,
/// hardware_fit, speed_fit, ecosystem_maturity, approach_fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopsisWeights {
    pub content_similarity: f32,
    pub hardware_fit: f32,
    pub speed_fit: f32,
    pub ecosystem_maturity: f32,
    pub approach_fit: f32,
}

impl TopsisWeights {
    pub fn as_array(&self) -> [f32; 5] {
        [
            self.content_similarity,
            self.hardware_fit,
            self.speed_fit,
            self.ecosystem_maturity,
            self.approach_fit,
        ]
    }

    fn validate(&self) -> ConfigResult<()> {
        let sum: f32 = self.as_array().iter().sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(ConfigError::Validation(format!(
                "TOPSIS weights must sum to 1.0, got {sum}"
            )));
        }
        if self.as_array().iter().any(|w| *w < 0.0) {
            return Err(ConfigError::Validation(
                "TOPSIS weights must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for TopsisWeights {
    fn default() -> Self {
        let [content_similarity, hardware_fit, speed_fit, ecosystem_maturity, approach_fit] =
            TOPSIS_WEIGHTS_DEFAULT;
        Self {
            content_similarity,
            hardware_fit,
            speed_fit,
            ecosystem_maturity,
            approach_fit,
        }
    }
}

/// Parses `RECOMMEND_TOPSIS_WEIGHTS` as five comma-separated floats in the
/// fixed criteria order (content_similarity, hardware_fit, speed_fit,
/// ecosystem_maturity, approach_fit), e.g. `"0.35,0.25,0.15,0.15,0.10"`.
/// Malformed input is ignored, not defaulted — the caller keeps whatever
/// weights the file/defaults already produced.
fn parse_topsis_weights(raw: &str) -> Option<TopsisWeights> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 5 {
        return None;
    }
    let mut values = [0.0f32; 5];
    for (i, part) in parts.iter().enumerate() {
        values[i] = part.parse().ok()?;
    }
    let [content_similarity, hardware_fit, speed_fit, ecosystem_maturity, approach_fit] = values;
    Some(TopsisWeights {
        content_similarity,
        hardware_fit,
        speed_fit,
        ecosystem_maturity,
        approach_fit,
    })
}

/// Tunables for the resolution cascade (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Number of top-ranked candidates per modality the cascade attempts
    /// to rescue when flagged `requires_resolution`.
    pub top_k: usize,
    /// CPU-offload performance factor when `cpu.tier == HIGH`.
    pub offload_slowdown_high: f32,
    /// CPU-offload performance factor when `cpu.tier == MEDIUM`.
    pub offload_slowdown_medium: f32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            top_k: CASCADE_TOP_K_DEFAULT,
            offload_slowdown_high: OFFLOAD_SLOWDOWN_HIGH_DEFAULT,
            offload_slowdown_medium: OFFLOAD_SLOWDOWN_MEDIUM_DEFAULT,
        }
    }
}

/// Top-level recommender configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default)]
    pub topsis_weights: TopsisWeights,
    #[serde(default = "default_speed_priority_weight_switch")]
    pub speed_priority_weight_switch: f32,
    #[serde(default)]
    pub topsis_weights_speed_priority: TopsisWeights,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
}

fn default_speed_priority_weight_switch() -> f32 {
    SPEED_PRIORITY_WEIGHT_SWITCH
}

fn default_probe_timeout_secs() -> u64 {
    PROBE_TIMEOUT_SECS_DEFAULT
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from(CATALOG_PATH_DEFAULT)
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        let [content_similarity, hardware_fit, speed_fit, ecosystem_maturity, approach_fit] =
            TOPSIS_WEIGHTS_SPEED_PRIORITY;
        Self {
            topsis_weights: TopsisWeights::default(),
            speed_priority_weight_switch: SPEED_PRIORITY_WEIGHT_SWITCH,
            topsis_weights_speed_priority: TopsisWeights {
                content_similarity,
                hardware_fit,
                speed_fit,
                ecosystem_maturity,
                approach_fit,
            },
            cascade: CascadeConfig::default(),
            probe_timeout_secs: PROBE_TIMEOUT_SECS_DEFAULT,
            catalog_path: default_catalog_path(),
        }
    }
}

impl RecommenderConfig {
    /// Load from the default path (or `RECOMMEND_CONFIG` if set), falling
    /// back to built-in defaults (with environment overrides applied) if
    /// no file is present.
    pub fn load() -> ConfigResult<Self> {
        let path = env::var(CONFIG_PATH_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_PATH_DEFAULT));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!(path = %path.display(), "no config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        info!(path = %path.display(), "recommender configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("RECOMMEND_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.probe_timeout_secs = secs;
            }
        }
        if let Ok(v) = env::var("RECOMMEND_CATALOG_PATH") {
            self.catalog_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("RECOMMEND_CASCADE_TOP_K") {
            if let Ok(k) = v.parse() {
                self.cascade.top_k = k;
            }
        }
        if let Ok(v) = env::var("RECOMMEND_TOPSIS_WEIGHTS") {
            if let Some(weights) = parse_topsis_weights(&v) {
                self.topsis_weights = weights;
            }
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        self.topsis_weights.validate()?;
        self.topsis_weights_speed_priority.validate()?;
        if self.cascade.top_k == 0 {
            return Err(ConfigError::Validation(
                "cascade.top_k must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
