//! Tolerant JSON extraction from free-form model output.
//!
//! Models asked for "JSON only" still wrap their answer in prose or
//! markdown fences often enough that a plain parse cannot be trusted.
//! The fallback scans for the first brace-balanced object, tracking
//! string literals and escapes so braces inside strings don't confuse
//! the depth counter.

use serde_json::Value;

/// Extract a JSON object from raw model output.
///
/// Tries a direct parse first, then the first balanced `{...}` substring.
/// Returns `None` when neither parses; the caller treats that as a
/// retryable "could not understand model output" condition.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidate = balanced_object(raw)?;
    serde_json::from_str::<Value>(candidate).ok()
}

/// Locate the first top-level brace-balanced `{...}` substring.
fn balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
