//! `spanseq` Configuration Module
//!
//! Provides configuration file support via `spanseq.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (explicit `OptimizerConfig` passed to the optimizer)
//! 2. Environment variables (`SPANSEQ_*`, sections separated by `__`,
//!    e.g. `SPANSEQ_OPTIMIZER__NFA_THRESHOLD=500`)
//! 3. Configuration file (`spanseq.toml`)
//! 4. Default values
//!
//! The optimizer never reads global state on its own: callers pass an
//! [`OptimizerConfig`] explicitly. [`global_optimizer_config`] is a process-wide
//! default that can be swapped at reload time.

use arc_swap::ArcSwap;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// Clause-combiner optimizer configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum absolute NFA factor accepted by the NFA combiner.
    pub nfa_threshold: u32,
    /// Divider modelling skip-based intersection in the combined reverse cost.
    pub term_freq_divider: u64,
    /// Minimum number of unique terms in a field before NFA matching is considered.
    pub min_unique_terms: u64,
    /// Enable forward-index (NFA) matching.
    pub nfa_matching_enabled: bool,
    /// Apply the `min_unique_terms` gate.
    pub require_many_unique_terms: bool,
    /// Upper bound on fixed-point rewrite passes.
    pub max_rewrite_passes: u32,
}

impl OptimizerConfig {
    /// Default NFA threshold.
    pub const DEFAULT_NFA_THRESHOLD: u32 = 900;
    /// Default term frequency divider.
    pub const DEFAULT_TERM_FREQ_DIVIDER: u64 = 500;
    /// Default unique term gate.
    pub const DEFAULT_MIN_UNIQUE_TERMS: u64 = 10_000;

    /// Returns a copy with forward-index matching switched off.
    #[must_use]
    pub fn without_nfa(mut self) -> Self {
        self.nfa_matching_enabled = false;
        self
    }

    /// Returns a copy with the NFA threshold replaced.
    #[must_use]
    pub fn with_nfa_threshold(mut self, threshold: u32) -> Self {
        self.nfa_threshold = threshold;
        self
    }

    /// Returns a copy with the unique-term gate switched on or off.
    #[must_use]
    pub fn with_unique_terms_gate(mut self, enabled: bool) -> Self {
        self.require_many_unique_terms = enabled;
        self
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            nfa_threshold: Self::DEFAULT_NFA_THRESHOLD,
            term_freq_divider: Self::DEFAULT_TERM_FREQ_DIVIDER,
            min_unique_terms: Self::DEFAULT_MIN_UNIQUE_TERMS,
            nfa_matching_enabled: true,
            require_many_unique_terms: true,
            max_rewrite_passes: 100,
        }
    }
}

/// Search execution configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search timeout in milliseconds (0 = no deadline).
    pub timeout_ms: u64,
    /// Maximum number of hits collected (0 = unlimited).
    pub max_hits: usize,
    /// Evaluate shards in parallel.
    pub parallel_shards: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_hits: 1_000_000,
            parallel_shards: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `spanseq` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpanseqConfig {
    /// Optimizer configuration.
    pub optimizer: OptimizerConfig,
    /// Search configuration.
    pub search: SearchConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl SpanseqConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("spanseq.toml")
    }

    /// Loads configuration from a specific file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SPANSEQ_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.optimizer.term_freq_divider == 0 {
            return Err(ConfigError::InvalidValue {
                key: "optimizer.term_freq_divider".to_string(),
                message: "value must be > 0".to_string(),
            });
        }

        if !(1..=10_000).contains(&self.optimizer.max_rewrite_passes) {
            return Err(ConfigError::InvalidValue {
                key: "optimizer.max_rewrite_passes".to_string(),
                message: format!(
                    "value {} is out of range [1, 10000]",
                    self.optimizer.max_rewrite_passes
                ),
            });
        }

        if self.optimizer.nfa_threshold > 1_000_000 {
            return Err(ConfigError::InvalidValue {
                key: "optimizer.nfa_threshold".to_string(),
                message: format!(
                    "value {} is out of range [0, 1000000]",
                    self.optimizer.nfa_threshold
                ),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn global_cell() -> &'static ArcSwap<OptimizerConfig> {
    static GLOBAL: OnceLock<ArcSwap<OptimizerConfig>> = OnceLock::new();
    GLOBAL.get_or_init(|| ArcSwap::from_pointee(OptimizerConfig::default()))
}

/// Returns the process-wide default optimizer configuration.
#[must_use]
pub fn global_optimizer_config() -> Arc<OptimizerConfig> {
    global_cell().load_full()
}

/// Replaces the process-wide default optimizer configuration.
///
/// Searches already running keep the configuration they started with.
pub fn set_global_optimizer_config(config: OptimizerConfig) {
    tracing::info!(?config, "optimizer configuration replaced");
    global_cell().store(Arc::new(config));
}
