//! Run loop
//!
//! Drives one generation run: splits the request into batches, runs each
//! batch under the retry policy, deduplicates against everything accepted
//! so far, accumulates errors, reports progress, and assembles the final
//! result with its summary. Batches are strictly sequential because each
//! prompt depends on the exclusion list built from all prior batches.

use crate::config::Config;
use crate::llm::{self, LlmBackend};
use crate::prompt;
use crate::retry;
use crate::types::{
    BatchErrorKind, ErrorSummary, GenerationRequest, GenerationResult, Phrase, ProgressUpdate,
    RecordedError,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Owns the backend and pipeline settings for generation runs.
pub struct Orchestrator {
    backend: Arc<dyn LlmBackend>,
    batch_size: usize,
    request_timeout: Duration,
}

impl Orchestrator {
    /// Build from configuration, constructing the configured backend.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let backend: Arc<dyn LlmBackend> = Arc::from(llm::from_config(config));
        Self::with_backend(
            backend,
            config.pipeline.batch_size,
            Duration::from_secs(config.pipeline.request_timeout_secs),
        )
    }

    /// Build with an explicit backend. The seam the tests use.
    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn LlmBackend>,
        batch_size: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            batch_size: batch_size.max(1),
            request_timeout,
        }
    }

    /// Execute one generation run to completion.
    ///
    /// Never returns an error: every failure along the way is captured as
    /// data in the returned [`GenerationResult`].
    pub async fn run(&self, request: GenerationRequest) -> GenerationResult {
        let total = request.total_count;
        info!(
            total,
            batch_size = self.batch_size,
            level = %request.preferences.level,
            "Starting generation run"
        );

        let mut accepted: Vec<Phrase> = Vec::with_capacity(total);
        let mut seen_keys: HashSet<String> = HashSet::with_capacity(total);
        let mut errors: Vec<RecordedError> = Vec::new();
        let mut title: Option<String> = None;
        let mut remaining = total;
        let mut batch_index = 0usize;

        while remaining > 0 {
            let batch_request = self.batch_size.min(remaining);
            let excluded: Vec<String> = accepted.iter().map(|p| p.english.clone()).collect();
            let prompt_text = prompt::build(&request.preferences, batch_request, &excluded);

            let resolution =
                retry::run_batch(self.backend.as_ref(), &prompt_text, self.request_timeout).await;

            for error in resolution.errors {
                errors.push(RecordedError { batch_index, error });
            }

            if title.is_none()
                && let Some(batch_title) = resolution.title
            {
                title = Some(batch_title);
            }

            // Dedup against everything accepted so far (and within this
            // batch), then cap at what is still needed.
            let mut net_new: Vec<Phrase> = Vec::new();
            for phrase in resolution.phrases {
                if net_new.len() == remaining {
                    break;
                }
                if seen_keys.insert(phrase.dedup_key()) {
                    net_new.push(phrase);
                }
            }

            if net_new.is_empty() {
                // Nothing gained, whether through failure or duplicates.
                // Charge the nominal batch size against the budget so the
                // loop stays bounded; the shortfall shows up in the summary.
                remaining = remaining.saturating_sub(batch_request);
            } else {
                remaining -= net_new.len();
            }

            debug!(
                batch_index,
                added = net_new.len(),
                completed = accepted.len() + net_new.len(),
                remaining,
                "Batch concluded"
            );

            accepted.extend(net_new.iter().cloned());

            if let Some(on_progress) = &request.on_progress {
                on_progress(ProgressUpdate {
                    completed: accepted.len(),
                    total,
                    latest_phrases: net_new,
                });
            }

            batch_index += 1;
        }

        let error_summary = build_summary(accepted.len(), total, &errors);
        info!(
            accepted = accepted.len(),
            total,
            error_count = errors.len(),
            "Generation run finished"
        );

        GenerationResult {
            phrases: accepted,
            title,
            errors,
            error_summary,
        }
    }
}

/// Derive the run summary. `None` when the run saw no errors at all.
fn build_summary(
    accepted_count: usize,
    total: usize,
    errors: &[RecordedError],
) -> Option<ErrorSummary> {
    if errors.is_empty() {
        return None;
    }

    let mut kinds: Vec<BatchErrorKind> = Vec::new();
    for recorded in errors {
        if !kinds.contains(&recorded.error.kind) {
            kinds.push(recorded.error.kind);
        }
    }

    let kind_list = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let user_message = if accepted_count == 0 {
        "failed completely".to_string()
    } else if accepted_count < total {
        format!("finished with {accepted_count}/{total} cards, issues: {kind_list}")
    } else {
        format!("completed with minor issues: {kind_list}")
    };

    Some(ErrorSummary {
        kinds,
        total_errors: errors.len(),
        user_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BatchError;

    fn recorded(kind: BatchErrorKind) -> RecordedError {
        RecordedError {
            batch_index: 0,
            error: BatchError::new(kind, "boom"),
        }
    }

    #[test]
    fn no_errors_means_no_summary() {
        assert!(build_summary(5, 5, &[]).is_none());
    }

    #[test]
    fn zero_phrases_is_complete_failure() {
        let summary = build_summary(0, 5, &[recorded(BatchErrorKind::ParseFailure)]).unwrap();
        assert_eq!(summary.user_message, "failed completely");
        assert_eq!(summary.total_errors, 1);
    }

    #[test]
    fn under_delivery_names_the_shortfall() {
        let errors = [
            recorded(BatchErrorKind::NetworkFailure),
            recorded(BatchErrorKind::ValidationFailure),
        ];
        let summary = build_summary(3, 10, &errors).unwrap();
        assert_eq!(
            summary.user_message,
            "finished with 3/10 cards, issues: network_failure, validation_failure"
        );
    }

    #[test]
    fn full_delivery_with_errors_is_minor_issues() {
        let summary = build_summary(5, 5, &[recorded(BatchErrorKind::NetworkFailure)]).unwrap();
        assert_eq!(
            summary.user_message,
            "completed with minor issues: network_failure"
        );
    }

    #[test]
    fn kinds_are_distinct_in_first_seen_order() {
        let errors = [
            recorded(BatchErrorKind::ProviderFailure),
            recorded(BatchErrorKind::NetworkFailure),
            recorded(BatchErrorKind::ProviderFailure),
        ];
        let summary = build_summary(1, 5, &errors).unwrap();
        assert_eq!(
            summary.kinds,
            vec![
                BatchErrorKind::ProviderFailure,
                BatchErrorKind::NetworkFailure
            ]
        );
        assert_eq!(summary.total_errors, 3);
    }
}
