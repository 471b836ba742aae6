//! Tolerant navigation over loosely structured catalog documents.
//!
//! Every accessor answers `None` for a missing node or a node of the wrong
//! shape. Callers decide what a gap means; nothing here is fatal.

use serde_json::Value;

/// Depth-first search for the first object member named `key`.
///
/// Object members are visited before descending, in document order
/// (`serde_json` is built with `preserve_order`).
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|child| find_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer)?.as_str()
}

pub fn array_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a Vec<Value>> {
    value.pointer(pointer)?.as_array()
}

/// Numbers may arrive either as JSON numbers or as decimal strings.
pub fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text of the first run of a `{ "runs": [ { "text": .. } ] }` node, or its
/// `simpleText` form.
pub fn first_run_text<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    let node = value.pointer(pointer)?;
    node.pointer("/runs/0/text")
        .and_then(Value::as_str)
        .or_else(|| node.get("simpleText").and_then(Value::as_str))
}

/// Runs of a text node; empty when absent.
pub fn runs<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    array_at(value, pointer).map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_key_prefers_shallow_members() {
        let doc = json!({
            "a": { "target": 1 },
            "target": 2
        });
        assert_eq!(find_key(&doc, "target"), Some(&json!(2)));
    }

    #[test]
    fn test_find_key_follows_document_order() {
        let doc: Value =
            serde_json::from_str(r#"{ "z": { "target": 1 }, "a": { "target": 2 } }"#).unwrap();
        assert_eq!(find_key(&doc, "target"), Some(&json!(1)));
    }

    #[test]
    fn test_find_key_descends_arrays() {
        let doc = json!({ "tabs": [ {}, { "inner": { "panel": { "id": "x" } } } ] });
        assert_eq!(str_at(find_key(&doc, "panel").unwrap(), "/id"), Some("x"));
        assert!(find_key(&doc, "missing").is_none());
    }

    #[test]
    fn test_accessors_tolerate_shape_mismatch() {
        let doc = json!({ "n": "42", "m": 7, "s": { "x": 1 }, "title": { "simpleText": "Hi" } });
        assert_eq!(u64_at(&doc, "/n"), Some(42));
        assert_eq!(u64_at(&doc, "/m"), Some(7));
        assert_eq!(u64_at(&doc, "/s"), None);
        assert_eq!(str_at(&doc, "/m"), None);
        assert!(array_at(&doc, "/s").is_none());
        assert!(runs(&doc, "/nothing").is_empty());
        assert_eq!(first_run_text(&doc, "/title"), Some("Hi"));
    }
}
