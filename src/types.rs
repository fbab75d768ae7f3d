//! Core data model for the generation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Learner proficiency, ordered from weakest to strongest.
///
/// The ordering matters to the prompt builder: each tier maps to a different
/// vocabulary/complexity instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProficiencyLevel {
    CompleteBeginner,
    BasicUnderstanding,
    Intermediate,
    Advanced,
    Fluent,
    GodMode,
}

impl ProficiencyLevel {
    /// Human-readable label used in prompts and CLI output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::CompleteBeginner => "complete beginner",
            Self::BasicUnderstanding => "basic understanding",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Fluent => "fluent",
            Self::GodMode => "god mode",
        }
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '_'], "-").as_str() {
            "complete-beginner" | "beginner" => Ok(Self::CompleteBeginner),
            "basic-understanding" | "basic" => Ok(Self::BasicUnderstanding),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "fluent" => Ok(Self::Fluent),
            "god-mode" | "god" => Ok(Self::GodMode),
            other => Err(format!(
                "unknown proficiency level '{other}' (expected one of: beginner, basic, \
                 intermediate, advanced, fluent, god-mode)"
            )),
        }
    }
}

/// User-supplied generation preferences. Supplied once per run, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPreferences {
    /// Learner proficiency tier.
    pub level: ProficiencyLevel,
    /// A specific topic to generate around, if any.
    pub specific_topic: Option<String>,
    /// Situations the learner wants to practice (free text).
    pub situations: Option<String>,
    /// Topics the model should stay away from.
    pub topics_to_avoid: Option<String>,
    /// Tone scalar, 0 (deadpan) to 100 (absurd). Values above 100 are clamped.
    pub tone_level: u8,
}

impl GenerationPreferences {
    #[must_use]
    pub fn new(level: ProficiencyLevel) -> Self {
        Self {
            level,
            specific_topic: None,
            situations: None,
            topics_to_avoid: None,
            tone_level: 50,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.specific_topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_situations(mut self, situations: impl Into<String>) -> Self {
        self.situations = Some(situations.into());
        self
    }

    #[must_use]
    pub fn with_topics_to_avoid(mut self, avoid: impl Into<String>) -> Self {
        self.topics_to_avoid = Some(avoid.into());
        self
    }

    #[must_use]
    pub fn with_tone_level(mut self, tone: u8) -> Self {
        self.tone_level = tone.min(100);
        self
    }
}

/// Progress snapshot delivered to the caller after every batch.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Cumulative accepted phrase count.
    pub completed: usize,
    /// Total phrases requested for the run.
    pub total: usize,
    /// Phrases newly accepted in this batch (empty if it contributed nothing).
    pub latest_phrases: Vec<Phrase>,
}

/// Progress callback. Invoked synchronously between batches; a slow or
/// panicking callback is the caller's responsibility.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// One end-to-end generation request, consumed once by the orchestrator.
#[derive(Clone)]
pub struct GenerationRequest {
    pub preferences: GenerationPreferences,
    /// Total desired phrase count. Zero yields an empty result.
    pub total_count: usize,
    pub on_progress: Option<ProgressFn>,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(preferences: GenerationPreferences, total_count: usize) -> Self {
        Self {
            preferences,
            total_count,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, callback: ProgressFn) -> Self {
        self.on_progress = Some(callback);
        self
    }
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("preferences", &self.preferences)
            .field("total_count", &self.total_count)
            .field("has_progress_callback", &self.on_progress.is_some())
            .finish()
    }
}

/// One example sentence attached to a phrase. All five fields are mandatory;
/// the validator rejects the whole containing phrase if any example is
/// incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleSentence {
    pub thai: String,
    pub thai_masculine: String,
    pub thai_feminine: String,
    pub pronunciation: String,
    pub translation: String,
}

/// A validated flashcard phrase. Immutable within the pipeline; downstream
/// persistence may assign a durable ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
    pub english: String,
    pub thai: String,
    pub thai_masculine: String,
    pub thai_feminine: String,
    pub pronunciation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleSentence>,
}

impl Phrase {
    /// Identity key for deduplication: the source-language text, case- and
    /// whitespace-normalized. Two phrases with the same key are the same
    /// card regardless of other field differences.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        normalize_dedup_key(&self.english)
    }
}

/// Lowercase and collapse all whitespace runs to single spaces.
#[must_use]
pub fn normalize_dedup_key(source_text: &str) -> String {
    source_text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Closed classification of batch-attempt failures.
///
/// Retryability is decided by exhaustive matching in `retry::is_retryable`,
/// so adding a variant here forces a compile-time decision there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorKind {
    /// Transport-level failure: timeout, connection refused, DNS.
    NetworkFailure,
    /// The provider responded but declined or errored (auth, rate limit,
    /// misconfigured/uninitialized provider).
    ProviderFailure,
    /// Response text was not decodable, or decoded to the wrong shape.
    ParseFailure,
    /// Decoded fine, but one or more phrase records failed field checks.
    ValidationFailure,
    /// Safety net for anything not fitting the above. Never swallowed.
    Unclassified,
}

impl std::fmt::Display for BatchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NetworkFailure => "network_failure",
            Self::ProviderFailure => "provider_failure",
            Self::ParseFailure => "parse_failure",
            Self::ValidationFailure => "validation_failure",
            Self::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

/// Record of one failed batch attempt. Produced fresh per attempt and never
/// retried itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    pub kind: BatchErrorKind,
    pub message: String,
    /// Structured diagnostic payload (e.g. a bounded response snippet or a
    /// rejection count). Never the full response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl BatchError {
    #[must_use]
    pub fn new(kind: BatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// A batch error paired with the index of the batch it occurred in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedError {
    pub batch_index: usize,
    #[serde(flatten)]
    pub error: BatchError,
}

/// Derived run summary, present only when at least one error occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Distinct error kinds seen, in first-seen order.
    pub kinds: Vec<BatchErrorKind>,
    /// Total number of error records across all attempts.
    pub total_errors: usize,
    /// Status line suitable for showing to the user.
    pub user_message: String,
}

/// Terminal output of a run. Constructed once at the end; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Accepted phrases, deduplicated, in first-accepted order.
    pub phrases: Vec<Phrase>,
    /// First non-empty title any batch returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Every failed attempt across the run, in occurrence order, including
    /// attempts whose batch later succeeded on retry.
    pub errors: Vec<RecordedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<ErrorSummary>,
}

impl GenerationResult {
    /// Whether the run produced nothing and should be treated as a hard
    /// failure by the caller.
    #[must_use]
    pub fn is_complete_failure(&self) -> bool {
        self.phrases.is_empty() && !self.errors.is_empty()
    }
}
