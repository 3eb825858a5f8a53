use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AgentError;

/// Return the first JSON object found in a stage's raw output.
///
/// Tried in order: the whole trimmed text, the body of each fenced code block
/// (any language tag), then each balanced top-level `{ ... }` in the text.
/// A candidate must parse as a JSON object to be accepted.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    object_candidates(text)
        .next()
        .map(str::to_string)
        .ok_or_else(|| no_object(text))
}

fn object_candidates(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.trim();
    std::iter::once(trimmed)
        .chain(fenced_blocks(trimmed))
        .chain(balanced_objects(trimmed))
        .filter(|candidate| is_object(candidate))
}

fn is_object(candidate: &str) -> bool {
    candidate.starts_with('{')
        && matches!(serde_json::from_str::<Value>(candidate), Ok(Value::Object(_)))
}

fn no_object(text: &str) -> AgentError {
    AgentError::Parse(format!(
        "no JSON object in stage output (length={})",
        text.len()
    ))
}

/// Bodies of ```-fenced blocks, with the info string (e.g. `json`) dropped.
fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    text.split("```")
        .skip(1)
        .step_by(2)
        .map(|block| match block.split_once('\n') {
            Some((_info, body)) => body.trim(),
            None => block.trim(),
        })
}

/// Every balanced top-level `{ ... }` span, ignoring braces inside strings.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans.into_iter()
}

/// Deserialize a stage's record from raw Claude CLI output.
///
/// Candidates are tried in the order of [`extract_json`] and the first one that
/// fits `T` wins, so objects echoed ahead of the answer are skipped. When none
/// fits, the error names `T` and shows the first object found.
pub fn parse_stage_output<T: DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    let mut first_mismatch = None;
    for candidate in object_candidates(raw) {
        match serde_json::from_str(candidate) {
            Ok(record) => return Ok(record),
            Err(e) if first_mismatch.is_none() => first_mismatch = Some((candidate, e)),
            Err(_) => {}
        }
    }

    match first_mismatch {
        Some((json_str, e)) => Err(AgentError::Parse(format!(
            "Failed to parse {}: {e}\nJSON: {json_str}",
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("stage output")
        ))),
        None => Err(no_object(raw)),
    }
}
