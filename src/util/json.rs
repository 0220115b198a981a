#![allow(dead_code)]

use serde_json::Value;

/// Extracts a JSON object from raw LLM output, trying progressively more
/// permissive strategies. Returns `None` only if no `{...}` span could be
/// found at all; callers fall back to `AnalysisResult::unavailable` in that
/// case rather than propagating an error, since a malformed LLM response is
/// an expected, per-posting failure mode, not a crate-level error.
pub(crate) fn extract_json_object(payload: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(payload.trim()) {
        return Some(value);
    }

    if let Some(fenced) = strip_code_fence(payload) {
        if let Ok(value) = serde_json::from_str::<Value>(&fenced) {
            return Some(value);
        }
    }

    let braced = extract_outermost_braces(payload)?;
    serde_json::from_str::<Value>(&braced).ok()
}

fn strip_code_fence(payload: &str) -> Option<String> {
    let trimmed = payload.trim();
    let without_lang_fence = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))?;
    let body = without_lang_fence
        .strip_suffix("```")
        .unwrap_or(without_lang_fence);
    Some(body.trim().to_string())
}

/// Scans for the first `{` and its matching `}`, tracking string literals so
/// braces inside quoted values don't throw off the depth count.
fn extract_outermost_braces(payload: &str) -> Option<String> {
    let bytes = payload.as_bytes();
    let start = payload.find('{')?;

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(payload[start..end].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_directly() {
        let value = extract_json_object(r#"{"matching_score": 80}"#).unwrap();
        assert_eq!(value["matching_score"], 80);
    }

    #[test]
    fn strips_fenced_json() {
        let payload = "```json\n{\"matching_score\": 70}\n```";
        let value = extract_json_object(payload).unwrap();
        assert_eq!(value["matching_score"], 70);
    }

    #[test]
    fn extracts_braces_from_surrounding_prose() {
        let payload =
            "Sure, here is the analysis:\n{\"matching_score\": 55, \"summary\": \"ok\"}\nHope that helps!";
        let value = extract_json_object(payload).unwrap();
        assert_eq!(value["matching_score"], 55);
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn braces_inside_string_values_do_not_break_depth_tracking() {
        let payload = r#"{"summary": "candidate fits { well }", "matching_score": 90}"#;
        let value = extract_json_object(payload).unwrap();
        assert_eq!(value["matching_score"], 90);
    }

    #[test]
    fn returns_none_when_no_object_present() {
        assert!(extract_json_object("not json at all").is_none());
    }
}
