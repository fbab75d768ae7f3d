//! Response parsing
//!
//! Turns the model's raw response text into a title and a list of raw phrase
//! records. Tolerates code-fence wrapping; on failure carries a bounded
//! snippet of the offending text rather than the full payload.

use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of offending text carried in diagnostics.
const SNIPPET_MAX_CHARS: usize = 200;

/// Successful parse: an optional set title plus the raw phrase records,
/// still unvalidated.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub title: Option<String>,
    pub raw_phrases: Vec<Value>,
}

/// Parse failure. `detail` distinguishes "couldn't decode" from "decoded but
/// wrong shape"; the kind is the same either way.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ParseFailure {
    pub message: String,
    pub detail: Value,
}

/// Parse the model's response text.
///
/// Strips a surrounding Markdown code fence (with or without a `json` tag)
/// before decoding. The top level must be an object with a `phrases` array;
/// anything else is a [`ParseFailure`].
///
/// # Errors
///
/// Returns `ParseFailure` when the text cannot be decoded as JSON or the
/// decoded value is not shaped as expected.
pub fn parse(raw_text: &str) -> Result<ParsedResponse, ParseFailure> {
    let stripped = strip_code_fence(raw_text);

    let value: Value = match serde_json::from_str(stripped) {
        Ok(v) => v,
        Err(e) => {
            return Err(ParseFailure {
                message: "model response was not valid JSON".to_string(),
                detail: serde_json::json!({
                    "reason": "decode",
                    "error": e.to_string(),
                    "snippet": snippet(stripped),
                }),
            });
        }
    };

    let Value::Object(mut object) = value else {
        return Err(ParseFailure {
            message: "model response JSON was not an object".to_string(),
            detail: serde_json::json!({
                "reason": "shape",
                "snippet": snippet(stripped),
            }),
        });
    };

    let Some(Value::Array(raw_phrases)) = object.remove("phrases") else {
        return Err(ParseFailure {
            message: "model response object has no phrases array".to_string(),
            detail: serde_json::json!({
                "reason": "shape",
                "snippet": snippet(stripped),
            }),
        });
    };

    let title = match object.remove("cleverTitle") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };

    Ok(ParsedResponse { title, raw_phrases })
}

/// Strip one surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // The opening fence may carry a language tag on its own line.
    let body = match body.split_once('\n') {
        Some((first_line, remainder)) if first_line.trim().chars().all(char::is_alphanumeric) => {
            remainder
        }
        _ => body,
    };
    body.trim()
}

/// Bounded, char-boundary-safe excerpt for diagnostics.
fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_MAX_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
        format!("{cut}…")
    }
}
