//! Retry policy
//!
//! Owns attempt counting and backoff for one batch. Transient failures
//! (network, provider, unclassified) are retried with exponential backoff
//! up to a fixed cap; data-shape failures (parse, validation) are final on
//! the first attempt because retrying cannot change the cause.

use crate::batch::{self, AttemptOutcome};
use crate::llm::LlmBackend;
use crate::types::{BatchError, BatchErrorKind, Phrase};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts per batch, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base unit of the backoff schedule.
const BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Whether an error kind is worth another attempt.
///
/// Exhaustive on purpose: a new kind forces a decision here.
#[must_use]
pub fn is_retryable(kind: BatchErrorKind) -> bool {
    match kind {
        BatchErrorKind::NetworkFailure
        | BatchErrorKind::ProviderFailure
        | BatchErrorKind::Unclassified => true,
        BatchErrorKind::ParseFailure | BatchErrorKind::ValidationFailure => false,
    }
}

/// Backoff before the retry following the given 1-based attempt number:
/// 1000ms doubled per attempt (2s after attempt 1, 4s after attempt 2).
#[must_use]
pub fn backoff_after(attempt_number: u32) -> Duration {
    BACKOFF_UNIT * 2u32.saturating_pow(attempt_number)
}

/// Final outcome of one batch after the retry policy has run its course.
#[derive(Debug, Default)]
pub struct BatchResolution {
    /// Phrases from the attempt that concluded the batch.
    pub phrases: Vec<Phrase>,
    /// Title from the concluding attempt, if any.
    pub title: Option<String>,
    /// Every failed attempt's error, in attempt order. Non-empty even when
    /// a later retry succeeded.
    pub errors: Vec<BatchError>,
}

/// Run one batch to conclusion under the retry policy.
pub async fn run_batch(
    backend: &dyn LlmBackend,
    prompt: &str,
    timeout: Duration,
) -> BatchResolution {
    let mut errors = Vec::new();

    for attempt_number in 1..=MAX_ATTEMPTS {
        let AttemptOutcome {
            phrases,
            title,
            error,
        } = batch::run_attempt(backend, prompt, timeout).await;

        let Some(error) = error else {
            debug!(attempt = attempt_number, "Batch attempt succeeded");
            return BatchResolution {
                phrases,
                title,
                errors,
            };
        };

        let retryable = is_retryable(error.kind);
        errors.push(error.clone());

        if !retryable {
            // Final on first occurrence; partial phrases are kept.
            debug!(
                attempt = attempt_number,
                kind = %error.kind,
                accepted = phrases.len(),
                "Batch attempt concluded without retry"
            );
            return BatchResolution {
                phrases,
                title,
                errors,
            };
        }

        if attempt_number < MAX_ATTEMPTS {
            let backoff = backoff_after(attempt_number);
            warn!(
                attempt = attempt_number,
                kind = %error.kind,
                backoff_ms = backoff.as_millis() as u64,
                "Batch attempt failed, will retry"
            );
            tokio::time::sleep(backoff).await;
        } else {
            warn!(
                attempt = attempt_number,
                kind = %error.kind,
                "Batch attempts exhausted"
            );
        }
    }

    // Retries exhausted; the batch contributes nothing.
    BatchResolution {
        phrases: Vec::new(),
        title: None,
        errors,
    }
}
