//! Model backend abstraction
//!
//! This module is the sole I/O boundary to the external generative model.
//! All backends implement the [`LlmBackend`] trait; every failure path is
//! classified into an [`InvokeError`] so the pipeline never sees an uncaught
//! transport or provider exception.

mod anthropic;
pub(crate) mod http_client;

pub use anthropic::{AnthropicBackend, BackendInitError};

use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Classified failure from one backend invocation.
#[derive(Error, Debug, Clone)]
pub enum InvokeError {
    /// Transport-level failure: timeout, connection refused, DNS.
    #[error("network error: {0}")]
    Network(String),

    /// The provider responded but declined or errored, or could not be
    /// constructed at all. Carries the HTTP status when one is available.
    #[error("provider error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Provider {
        message: String,
        status: Option<u16>,
    },

    /// Anything that does not fit the above. Surfaced, never swallowed.
    #[error("unexpected backend error: {0}")]
    Unclassified(String),
}

/// Input to one backend invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Full prompt text, already built by the prompt builder.
    pub prompt: String,
    /// Per-call timeout, enforced by the backend.
    pub timeout: Duration,
}

impl Invocation {
    #[must_use]
    pub fn new(prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            prompt: prompt.into(),
            timeout,
        }
    }
}

/// Trait for model backend implementations.
///
/// Implementations must return a classified [`InvokeError`] on every failure
/// path; callers rely on the classification to decide retryability.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the model once with the given prompt and return its raw
    /// response text.
    async fn invoke(&self, inv: Invocation) -> Result<String, InvokeError>;
}

/// Backend stand-in for a provider that could not be constructed.
///
/// The pipeline contract forbids pre-flight misconfiguration from escaping
/// as a hard error: it must surface as a provider failure on the first
/// attempt. The factory therefore downgrades construction failures to this
/// backend, which reports the stored reason on every call.
pub struct UnconfiguredBackend {
    reason: String,
}

impl UnconfiguredBackend {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmBackend for UnconfiguredBackend {
    async fn invoke(&self, _inv: Invocation) -> Result<String, InvokeError> {
        Err(InvokeError::Provider {
            message: format!("LLM provider not configured: {}", self.reason),
            status: None,
        })
    }
}

/// Construct a backend from configuration.
///
/// Never fails: a provider that cannot be constructed (unknown name, missing
/// API key, missing model) yields an [`UnconfiguredBackend`] whose every
/// invocation returns a provider-classified error.
#[must_use]
pub fn from_config(config: &Config) -> Box<dyn LlmBackend> {
    let provider = config.llm.provider.as_deref().unwrap_or("anthropic");

    match provider {
        "anthropic" => match AnthropicBackend::new_from_config(config) {
            Ok(backend) => Box::new(backend),
            Err(reason) => {
                tracing::warn!(provider, %reason, "backend construction failed");
                Box::new(UnconfiguredBackend::new(reason.to_string()))
            }
        },
        unknown => Box::new(UnconfiguredBackend::new(format!(
            "unknown LLM provider '{unknown}'. Supported providers: anthropic."
        ))),
    }
}
