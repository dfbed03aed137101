//! Normalization of remote error payloads into human-readable strings.
//!
//! The hosted store reports failures as loosely shaped JSON (PostgREST
//! bodies, gateway errors, plain strings). Everything crossing the adapter
//! boundary is reduced to one descriptive string here, so callers never see
//! raw error objects or a useless stringified placeholder.

use serde_json::Value;

/// Final fallback when nothing usable can be extracted.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Candidate fields probed when coercing a loose value to text.
const TEXT_FIELDS: [&str; 5] = ["message", "text", "title", "name", "value"];

/// Best-effort coercion of a loosely-typed value to a display string.
///
/// Probes a fixed set of candidate fields (one nesting level deep), then
/// falls back to JSON serialization, then to `fallback`. The degenerate
/// serializations `"{}"` and `"[]"` are rejected in favor of the fallback.
pub fn coerce_text(value: &Value, fallback: &str) -> String {
  if let Some(s) = probe_text(value, 1) {
    return s;
  }
  match serde_json::to_string(value) {
    Ok(json) if json != "{}" && json != "[]" && json != "null" => json,
    _ => fallback.to_string(),
  }
}

fn probe_text(value: &Value, depth: u8) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Object(map) => {
      for field in TEXT_FIELDS {
        if let Some(inner) = map.get(field) {
          if let Value::String(s) = inner {
            if !s.is_empty() {
              return Some(s.clone());
            }
          } else if depth > 0 {
            if let Some(s) = probe_text(inner, depth - 1) {
              return Some(s);
            }
          }
        }
      }
      None
    }
    _ => None,
  }
}

/// Reduce a remote error payload to a single descriptive string.
///
/// Priority order: explicit `message`, then `details`, then `hint`
/// (appended as "Hint: …"), then `code` (appended in brackets). When none of
/// those structured fields exist, falls back to [`coerce_text`].
pub fn describe_remote_error(err: &Value) -> String {
  if err.is_null() {
    return UNKNOWN_ERROR.to_string();
  }
  if let Value::String(s) = err {
    if !s.is_empty() {
      return s.clone();
    }
    return UNKNOWN_ERROR.to_string();
  }

  let mut parts: Vec<String> = Vec::new();
  if let Some(msg) = err.get("message").and_then(Value::as_str) {
    if !msg.is_empty() {
      parts.push(msg.to_string());
    }
  }
  if let Some(details) = err.get("details").and_then(Value::as_str) {
    if !details.is_empty() {
      parts.push(details.to_string());
    }
  }
  if let Some(hint) = err.get("hint").and_then(Value::as_str) {
    if !hint.is_empty() {
      parts.push(format!("Hint: {}", hint));
    }
  }
  if let Some(code) = err.get("code") {
    match code {
      Value::String(c) if !c.is_empty() => parts.push(format!("[Error Code: {}]", c)),
      Value::Number(c) => parts.push(format!("[Error Code: {}]", c)),
      _ => {}
    }
  }

  if !parts.is_empty() {
    return parts.join(" | ");
  }

  coerce_text(err, UNKNOWN_ERROR)
}

/// Machine error code of a remote failure, if the body carries one.
pub fn error_code(err: &Value) -> Option<&str> {
  err.get("code").and_then(Value::as_str)
}

/// PostgREST code for "column not found in schema cache", the signal for
/// the reduced-field insert retry.
pub const MISSING_COLUMN_CODE: &str = "PGRST204";

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn message_details_hint_code_joined_in_order() {
    let err = json!({
      "message": "duplicate key value",
      "details": "Key (id)=(p1) already exists.",
      "hint": "Use a different id",
      "code": "23505"
    });
    assert_eq!(
      describe_remote_error(&err),
      "duplicate key value | Key (id)=(p1) already exists. | Hint: Use a different id | [Error Code: 23505]"
    );
  }

  #[test]
  fn code_only_body_still_readable() {
    let err = json!({ "code": "PGRST204" });
    assert_eq!(describe_remote_error(&err), "[Error Code: PGRST204]");
  }

  #[test]
  fn plain_string_passes_through() {
    assert_eq!(describe_remote_error(&json!("connection refused")), "connection refused");
  }

  #[test]
  fn nested_text_field_is_unwrapped() {
    let err = json!({ "error": true, "title": { "text": "service unavailable" } });
    assert_eq!(describe_remote_error(&err), "service unavailable");
  }

  #[test]
  fn unstructured_body_serializes_to_json() {
    let err = json!({ "status": 502, "upstream": "edge-3" });
    let out = describe_remote_error(&err);
    assert!(out.contains("502"), "got: {out}");
    assert!(out.contains("upstream"), "got: {out}");
  }

  #[test]
  fn degenerate_bodies_never_degenerate_output() {
    // Naive object-to-string placeholders must never escape.
    assert_eq!(describe_remote_error(&json!({})), UNKNOWN_ERROR);
    assert_eq!(describe_remote_error(&json!([])), UNKNOWN_ERROR);
    assert_eq!(describe_remote_error(&Value::Null), UNKNOWN_ERROR);
    assert_eq!(describe_remote_error(&json!("")), UNKNOWN_ERROR);
  }

  #[test]
  fn coerce_text_honors_field_order() {
    let v = json!({ "name": "late", "message": "first" });
    assert_eq!(coerce_text(&v, UNKNOWN_ERROR), "first");
  }

  #[test]
  fn error_code_extraction() {
    assert_eq!(error_code(&json!({ "code": "PGRST204" })), Some("PGRST204"));
    assert_eq!(error_code(&json!({ "message": "x" })), None);
  }
}
