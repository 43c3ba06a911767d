//! Handling of free-form model text that is supposed to contain JSON.

use serde_json::Value;

use crate::error::AnalyzeError;

/// Remove a surrounding Markdown code fence (```` ```json ... ``` ````).
///
/// Text without a leading fence is returned trimmed. The language tag on
/// the opening fence is ignored, whatever it is.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag (everything up to the first newline). A
    // single-line fence like ```{"a":1}``` has no tag.
    let body = match after_open.find('\n') {
        Some(idx) if !after_open[..idx].contains('{') => &after_open[idx + 1..],
        _ => after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse model output as a JSON object.
///
/// Fences are stripped first. If the remainder still is not valid JSON the
/// outermost `{ ... }` span is tried, since models sometimes wrap the
/// object in a sentence. Fails with [`AnalyzeError::NonJson`] carrying the
/// untouched text.
pub fn parse_model_json(text: &str) -> Result<Value, AnalyzeError> {
    let body = strip_code_fences(text);

    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(body) {
        return Ok(v);
    }

    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
        if start < end {
            if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(&body[start..=end]) {
                return Ok(v);
            }
        }
    }

    Err(AnalyzeError::NonJson {
        raw: text.to_string(),
    })
}
