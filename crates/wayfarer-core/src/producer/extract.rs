//! Pulling structured records out of generated text.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::ProducerError;

/// Locate and parse the outermost JSON array or object in `text`.
///
/// Generated content often wraps JSON in prose or code fences; the earliest
/// opening bracket and the last matching closing bracket delimit the
/// candidate.
pub fn extract_json(text: &str) -> Result<Value, ProducerError> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Ok(value);
    }

    let mut candidates: Vec<(usize, usize)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (start < end).then_some((start, end))
        })
        .collect();
    candidates.sort_by_key(|(start, _)| *start);

    candidates
        .into_iter()
        .find_map(|(start, end)| serde_json::from_str(&text[start..=end]).ok())
        .ok_or_else(|| ProducerError::Malformed("no JSON found in generated content".to_owned()))
}

/// The list of items in `value`: either a top-level array, or an object
/// holding the array under `key`.
pub fn item_list(value: Value, key: &str) -> Result<Vec<Value>, ProducerError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ProducerError::Malformed(format!(
                "expected a JSON array of {key}"
            ))),
        },
        _ => Err(ProducerError::Malformed(format!(
            "expected a JSON array of {key}"
        ))),
    }
}

/// Decode and validate each item, skipping the ones that fail.
pub fn parse_items<T, F>(items: Vec<Value>, what: &str, validate: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed: T = match serde_json::from_value(item) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(what, index, error = %e, "skipping undecodable item");
                    return None;
                }
            };
            match validate(&parsed) {
                Ok(()) => Some(parsed),
                Err(reason) => {
                    tracing::warn!(what, index, %reason, "skipping invalid item");
                    None
                }
            }
        })
        .collect()
}
