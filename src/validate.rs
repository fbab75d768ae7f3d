//! Phrase record validation
//!
//! One raw decoded JSON value in, one accepted [`Phrase`] or a rejection
//! out. Rejection is a per-record outcome collected by the batch runner,
//! never an exception that halts the batch.

use crate::types::{ExampleSentence, Phrase};
use serde::Deserialize;
use serde_json::Value;

/// Why a single record was rejected. Bounded, human-readable, safe to embed
/// in a batch error's detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Raw phrase record as decoded, before field-level checks. Every field is
/// optional here so that missing fields become rejections, not decode
/// errors; a present field of the wrong type fails the decode and rejects
/// the record the same way.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPhrase {
    english: Option<String>,
    thai: Option<String>,
    thai_masculine: Option<String>,
    thai_feminine: Option<String>,
    pronunciation: Option<String>,
    mnemonic: Option<String>,
    examples: Option<Vec<RawExample>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExample {
    thai: Option<String>,
    thai_masculine: Option<String>,
    thai_feminine: Option<String>,
    pronunciation: Option<String>,
    translation: Option<String>,
}

/// Validate one raw record.
///
/// A record is accepted iff all five mandatory fields are present, strings,
/// and non-empty after trimming; a present mnemonic is kept unless blank;
/// and every entry in a present examples list is itself complete. One
/// malformed example rejects the whole phrase.
///
/// # Errors
///
/// Returns a [`Rejection`] naming what was wrong with the record.
pub fn validate(raw_record: &Value) -> Result<Phrase, Rejection> {
    let raw: RawPhrase = serde_json::from_value(raw_record.clone())
        .map_err(|e| Rejection::new(format!("record does not match phrase shape: {e}")))?;

    let english = mandatory("english", raw.english.as_deref())?;
    let thai = mandatory("thai", raw.thai.as_deref())?;
    let thai_masculine = mandatory("thaiMasculine", raw.thai_masculine.as_deref())?;
    let thai_feminine = mandatory("thaiFeminine", raw.thai_feminine.as_deref())?;
    let pronunciation = mandatory("pronunciation", raw.pronunciation.as_deref())?;

    let mnemonic = raw
        .mnemonic
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let mut examples = Vec::new();
    if let Some(raw_examples) = raw.examples {
        for (index, example) in raw_examples.iter().enumerate() {
            examples.push(validate_example(index, example)?);
        }
    }

    Ok(Phrase {
        english,
        thai,
        thai_masculine,
        thai_feminine,
        pronunciation,
        mnemonic,
        examples,
    })
}

fn validate_example(index: usize, raw: &RawExample) -> Result<ExampleSentence, Rejection> {
    let field = |name: &str, value: Option<&str>| -> Result<String, Rejection> {
        match value.map(str::trim) {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => Err(Rejection::new(format!(
                "example {index} is missing field '{name}'"
            ))),
        }
    };

    Ok(ExampleSentence {
        thai: field("thai", raw.thai.as_deref())?,
        thai_masculine: field("thaiMasculine", raw.thai_masculine.as_deref())?,
        thai_feminine: field("thaiFeminine", raw.thai_feminine.as_deref())?,
        pronunciation: field("pronunciation", raw.pronunciation.as_deref())?,
        translation: field("translation", raw.translation.as_deref())?,
    })
}

fn mandatory(name: &str, value: Option<&str>) -> Result<String, Rejection> {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(Rejection::new(format!("missing mandatory field '{name}'"))),
    }
}
