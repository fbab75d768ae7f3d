//! Configuration loading and defaults
//!
//! Configuration is read from a TOML file (`phrasegen.toml` by default).
//! Every field has a default so a missing file yields a usable config; the
//! LLM provider section is the only part that genuinely needs user input
//! (an API key environment variable and a model name).

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default batch size: how many phrases one model call asks for.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default per-call timeout for the model backend, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found at {path}")]
    NotFound { path: String },

    #[error("invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Pipeline tuning knobs. Retry count and backoff schedule are fixed by the
/// retry policy, not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Phrases requested per model call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-call timeout in seconds, enforced at the HTTP layer and
    /// classified as a network failure on expiry.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// LLM provider selection and provider-specific tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider name. Defaults to "anthropic" when absent.
    pub provider: Option<String>,
    pub anthropic: Option<AnthropicConfig>,
}

/// `[llm.anthropic]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Custom endpoint; defaults to the Anthropic Messages API.
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Defaults to
    /// `ANTHROPIC_API_KEY`.
    pub api_key_env: Option<String>,
    /// Model name. Required for the backend to construct.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist and
    /// `ConfigError::InvalidFile` if it cannot be parsed or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::InvalidFile(e.to_string())
            }
        })?;

        let config: Self =
            toml::from_str(&raw).map_err(|e| ConfigError::InvalidFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `phrasegen.toml` from the current directory if present, falling
    /// back to defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file exists but is invalid.
    pub fn discover() -> Result<Self, ConfigError> {
        let candidate = Path::new("phrasegen.toml");
        if candidate.exists() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pipeline.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.request_timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Minimal config for tests. Does not touch the filesystem or
    /// environment.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self::default()
    }
}
