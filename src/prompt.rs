//! Prompt construction
//!
//! Pure text assembly: preferences plus the running exclusion list become
//! one prompt. The exclusion list is the only generation-time channel that
//! steers the model away from already-accepted phrases; the orchestrator's
//! dedup step is the enforcement backstop.

use crate::types::{GenerationPreferences, ProficiencyLevel};
use std::fmt::Write;

/// Default situational framing when the caller gives none.
const DEFAULT_SITUATIONS: &str = "General conversation";

/// Build the prompt for one batch.
///
/// Deterministic and total: the same inputs always produce the same text,
/// and no input can make it fail.
#[must_use]
pub fn build(
    preferences: &GenerationPreferences,
    batch_size: usize,
    excluded_source_texts: &[String],
) -> String {
    let mut prompt = String::with_capacity(2048);

    let _ = writeln!(
        prompt,
        "Generate exactly {batch_size} Thai language flashcard phrases for an \
         English-speaking learner."
    );
    prompt.push('\n');

    let _ = writeln!(prompt, "Learner profile:");
    let _ = writeln!(
        prompt,
        "- Proficiency: {} ({})",
        preferences.level.label(),
        level_guidance(preferences.level)
    );

    let situations = preferences
        .situations
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SITUATIONS);
    let _ = writeln!(prompt, "- Situations to cover: {situations}");

    if let Some(topic) = preferences
        .specific_topic
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        let _ = writeln!(prompt, "- Specific topic focus: {topic}");
    }

    if let Some(avoid) = preferences
        .topics_to_avoid
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        let _ = writeln!(prompt, "- Topics to avoid: {avoid}");
    }

    let _ = writeln!(
        prompt,
        "- Tone: {} out of 100 ({})",
        preferences.tone_level,
        tone_guidance(preferences.tone_level)
    );
    prompt.push('\n');

    if !excluded_source_texts.is_empty() {
        let _ = writeln!(
            prompt,
            "Do NOT generate any of the following phrases (already produced \
             earlier in this set):"
        );
        for text in excluded_source_texts {
            let _ = writeln!(prompt, "- {text}");
        }
        prompt.push('\n');
    }

    prompt.push_str(OUTPUT_SCHEMA);
    prompt
}

/// Schema section appended to every prompt. The parser and validator enforce
/// exactly this shape on the way back.
const OUTPUT_SCHEMA: &str = r#"Respond with a single JSON object and nothing else, in this exact shape:
{
  "cleverTitle": "<short witty title for the whole set, optional>",
  "phrases": [
    {
      "english": "<the phrase in English>",
      "thai": "<the phrase in Thai script>",
      "thaiMasculine": "<Thai with male polite particle>",
      "thaiFeminine": "<Thai with female polite particle>",
      "pronunciation": "<romanized pronunciation>",
      "mnemonic": "<memory aid, optional>",
      "examples": [
        {
          "thai": "<example sentence in Thai>",
          "thaiMasculine": "<example with male polite particle>",
          "thaiFeminine": "<example with female polite particle>",
          "pronunciation": "<romanized pronunciation>",
          "translation": "<English translation>"
        }
      ]
    }
  ]
}
All phrase fields except mnemonic and examples are required. Every example
sentence must include all five of its fields.
"#;

fn level_guidance(level: ProficiencyLevel) -> &'static str {
    match level {
        ProficiencyLevel::CompleteBeginner => {
            "single words and two-word phrases, most common vocabulary only"
        }
        ProficiencyLevel::BasicUnderstanding => "short everyday phrases, simple grammar",
        ProficiencyLevel::Intermediate => "full sentences with common connectors",
        ProficiencyLevel::Advanced => "complex sentences, less common vocabulary",
        ProficiencyLevel::Fluent => "idiomatic and nuanced expressions",
        ProficiencyLevel::GodMode => "rare vocabulary, literary and formal registers",
    }
}

fn tone_guidance(tone_level: u8) -> &'static str {
    match tone_level {
        0..=20 => "completely serious and practical",
        21..=50 => "mostly practical with occasional light humor",
        51..=80 => "playful and humorous",
        _ => "absurd and maximally ridiculous",
    }
}
