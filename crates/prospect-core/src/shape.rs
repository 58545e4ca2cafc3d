//! Tool-result envelope handling.
//!
//! Upstream tools wrap their payloads in zero or more of `structuredContent` / `data`,
//! or report `{ "error": ... }`. Every compactor starts by reducing its input here.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Canonical failure marker: an upstream error, carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFailure {
    pub error: Value,
}

impl ToolFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Value::String(message.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "error": self.error })
    }
}

/// A compacted section, or the upstream failure that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Ready(T),
    Failed(ToolFailure),
}

impl<T> Section<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Section<U> {
        match self {
            Self::Ready(v) => Section::Ready(f(v)),
            Self::Failed(e) => Section::Failed(e),
        }
    }
}

impl<T> From<Result<T, ToolFailure>> for Section<T> {
    fn from(r: Result<T, ToolFailure>) -> Self {
        match r {
            Ok(v) => Self::Ready(v),
            Err(e) => Self::Failed(e),
        }
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ready(v) => v.serialize(serializer),
            Self::Failed(e) => e.serialize(serializer),
        }
    }
}

/// JavaScript-style truthiness, used where upstream presence checks are loose.
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn error_of(v: &Value) -> Option<&Value> {
    v.as_object()?.get("error").filter(|e| is_truthy(e))
}

/// Strip the tool envelope.
///
/// - non-objects are returned as-is
/// - a truthy `error` field wins and everything else is dropped
/// - otherwise `structuredContent`, then `data`, then the input itself
///
/// The chosen inner payload is checked for `error` once more, so a failure nested
/// directly under `structuredContent` is reported the same way.
pub fn unwrap_envelope(input: &Value) -> Result<&Value, ToolFailure> {
    let Some(obj) = input.as_object() else {
        return Ok(input);
    };
    if let Some(e) = error_of(input) {
        return Err(ToolFailure { error: e.clone() });
    }
    let inner = obj
        .get("structuredContent")
        .filter(|v| is_truthy(v))
        .or_else(|| obj.get("data").filter(|v| is_truthy(v)))
        .unwrap_or(input);
    match error_of(inner) {
        Some(e) => Err(ToolFailure { error: e.clone() }),
        None => Ok(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_drops_every_other_field() {
        let v = json!({"error": "boom", "structuredContent": {"a": 1}});
        let e = unwrap_envelope(&v).unwrap_err();
        assert_eq!(e.to_value(), json!({"error": "boom"}));
    }

    #[test]
    fn prefers_structured_content_over_data() {
        let v = json!({"structuredContent": {"a": 1}, "data": {"b": 2}});
        assert_eq!(unwrap_envelope(&v).unwrap(), &json!({"a": 1}));
        let v = json!({"data": {"b": 2}});
        assert_eq!(unwrap_envelope(&v).unwrap(), &json!({"b": 2}));
        let v = json!({"c": 3});
        assert_eq!(unwrap_envelope(&v).unwrap(), &json!({"c": 3}));
    }

    #[test]
    fn non_objects_pass_through() {
        assert_eq!(unwrap_envelope(&json!([1, 2])).unwrap(), &json!([1, 2]));
        assert_eq!(unwrap_envelope(&Value::Null).unwrap(), &Value::Null);
    }

    #[test]
    fn empty_error_is_not_a_failure() {
        let v = json!({"error": "", "x": 1});
        assert!(unwrap_envelope(&v).is_ok());
    }

    #[test]
    fn nested_structured_error_is_a_failure() {
        let v = json!({"structuredContent": {"error": "rate limited", "detail": 1}});
        assert_eq!(
            unwrap_envelope(&v).unwrap_err(),
            ToolFailure::new("rate limited")
        );
    }

    #[test]
    fn failed_section_serializes_as_error_object() {
        let s: Section<Vec<u8>> = Section::Failed(ToolFailure::new("boom"));
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"error": "boom"}));
        let s: Section<Vec<u8>> = Section::Ready(vec![1]);
        assert_eq!(serde_json::to_value(&s).unwrap(), json!([1]));
    }
}
