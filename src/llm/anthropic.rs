//! Anthropic Messages API backend
//!
//! Sends the built prompt as a single user message and returns the
//! concatenated text blocks of the response.

use crate::config::Config;
use crate::llm::http_client::HttpClient;
use crate::llm::{Invocation, InvokeError, LlmBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Default Anthropic API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Failure to construct a backend from configuration.
///
/// Distinct from [`InvokeError`]: construction failures are downgraded by
/// the factory rather than surfaced to callers.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct BackendInitError(String);

/// Anthropic HTTP backend.
#[derive(Clone, Debug)]
pub struct AnthropicBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    model: String,
    params: RequestParams,
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone)]
pub(crate) struct RequestParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl AnthropicBackend {
    /// Create a backend with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `BackendInitError` if the HTTP client cannot be constructed.
    pub(crate) fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        params: RequestParams,
    ) -> Result<Self, BackendInitError> {
        let client =
            HttpClient::new().map_err(|e| BackendInitError(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model,
            params,
        })
    }

    /// Create a backend from the `[llm.anthropic]` configuration table.
    ///
    /// # Errors
    ///
    /// Returns `BackendInitError` if the API key environment variable is not
    /// set or no model is configured.
    pub fn new_from_config(config: &Config) -> Result<Self, BackendInitError> {
        let anthropic = config.llm.anthropic.as_ref();

        let api_key_env = anthropic
            .and_then(|a| a.api_key_env.as_deref())
            .unwrap_or("ANTHROPIC_API_KEY");

        let api_key = std::env::var(api_key_env).map_err(|_| {
            BackendInitError(format!(
                "Anthropic API key not found in environment variable '{api_key_env}'. \
                 Set this variable or configure api_key_env in [llm.anthropic]."
            ))
        })?;

        let base_url = anthropic.and_then(|a| a.base_url.clone());

        let model = anthropic.and_then(|a| a.model.clone()).ok_or_else(|| {
            BackendInitError(
                "Anthropic model not specified in configuration. \
                 Set [llm.anthropic] model = \"model-name\"."
                    .to_string(),
            )
        })?;

        let defaults = RequestParams::default();
        let params = RequestParams {
            max_tokens: anthropic
                .and_then(|a| a.max_tokens)
                .unwrap_or(defaults.max_tokens),
            temperature: anthropic
                .and_then(|a| a.temperature)
                .unwrap_or(defaults.temperature),
        };

        Self::new(api_key, base_url, model, params)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: Invocation) -> Result<String, InvokeError> {
        debug!(
            provider = "anthropic",
            model = %self.model,
            max_tokens = self.params.max_tokens,
            temperature = self.params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let request_body = AnthropicRequest {
            model: self.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: inv.prompt,
            }],
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        };

        let request = reqwest::Client::new()
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body);

        let response = self
            .client
            .execute(request, inv.timeout, "anthropic")
            .await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            InvokeError::Unclassified(format!("failed to decode Anthropic response: {e}"))
        })?;

        let mut content_parts = Vec::new();
        for block in &response_body.content {
            if block.content_type == "text"
                && let Some(text) = &block.text
            {
                content_parts.push(text.clone());
            }
        }
        let content = content_parts.join("");

        if content.is_empty() {
            return Err(InvokeError::Unclassified(
                "Anthropic response missing text content".to_string(),
            ));
        }

        if let Some(usage) = response_body.usage {
            debug!(
                provider = "anthropic",
                tokens_input = usage.input_tokens,
                tokens_output = usage.output_tokens,
                "Anthropic invocation completed"
            );
        }

        Ok(content)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
