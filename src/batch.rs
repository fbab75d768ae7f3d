//! Single batch attempt
//!
//! Composes the backend invocation, response parsing, and per-record
//! validation into one attempt, and classifies the outcome. A partial
//! success carries both accepted phrases and a validation error; the
//! retry controller uses the classification to decide what happens next.

use crate::llm::{Invocation, InvokeError, LlmBackend};
use crate::parser;
use crate::types::{BatchError, BatchErrorKind, Phrase};
use crate::validate;
use std::time::Duration;
use tracing::debug;

/// Outcome of one attempt at one batch.
#[derive(Debug, Default)]
pub struct AttemptOutcome {
    /// Phrases that passed validation, in response order.
    pub phrases: Vec<Phrase>,
    /// Title the model offered for the whole set, if any.
    pub title: Option<String>,
    /// Classified failure, if anything went wrong. May coexist with
    /// non-empty `phrases` (partial success).
    pub error: Option<BatchError>,
}

impl AttemptOutcome {
    fn failed(error: BatchError) -> Self {
        Self {
            phrases: Vec::new(),
            title: None,
            error: Some(error),
        }
    }
}

/// Run one attempt: invoke the backend, parse, validate every record.
pub async fn run_attempt(
    backend: &dyn LlmBackend,
    prompt: &str,
    timeout: Duration,
) -> AttemptOutcome {
    let raw_text = match backend
        .invoke(Invocation::new(prompt.to_string(), timeout))
        .await
    {
        Ok(text) => text,
        Err(e) => return AttemptOutcome::failed(classify_invoke_error(e)),
    };

    let parsed = match parser::parse(&raw_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            return AttemptOutcome::failed(
                BatchError::new(BatchErrorKind::ParseFailure, e.message).with_detail(e.detail),
            );
        }
    };

    let raw_count = parsed.raw_phrases.len();
    let mut accepted = Vec::new();
    let mut rejections = Vec::new();
    for record in &parsed.raw_phrases {
        match validate::validate(record) {
            Ok(phrase) => accepted.push(phrase),
            Err(rejection) => rejections.push(rejection.reason),
        }
    }

    debug!(
        raw = raw_count,
        accepted = accepted.len(),
        rejected = rejections.len(),
        "Batch attempt validated"
    );

    let error = if rejections.is_empty() && !accepted.is_empty() {
        None
    } else if raw_count == 0 {
        // Parsed fine but the model sent an empty list. Nothing to retry
        // over and nothing to accept.
        Some(BatchError::new(
            BatchErrorKind::ValidationFailure,
            "model returned an empty phrase list",
        ))
    } else if !rejections.is_empty() {
        Some(
            BatchError::new(
                BatchErrorKind::ValidationFailure,
                format!(
                    "{} of {} phrase records failed validation",
                    rejections.len(),
                    raw_count
                ),
            )
            .with_detail(serde_json::json!({ "rejections": rejections })),
        )
    } else {
        None
    };

    AttemptOutcome {
        phrases: accepted,
        title: parsed.title,
        error,
    }
}

/// Map a backend error into a recorded batch error.
fn classify_invoke_error(error: InvokeError) -> BatchError {
    match error {
        InvokeError::Network(message) => {
            BatchError::new(BatchErrorKind::NetworkFailure, message)
        }
        InvokeError::Provider { message, status } => {
            let error = BatchError::new(BatchErrorKind::ProviderFailure, message);
            match status {
                Some(code) => error.with_detail(serde_json::json!({ "status": code })),
                None => error,
            }
        }
        InvokeError::Unclassified(message) => {
            BatchError::new(BatchErrorKind::Unclassified, message)
        }
    }
}
