use serde_json::Value;

/// Deterministic, ASCII-safe JSON rendering: object keys sorted, no
/// insignificant whitespace, non-ASCII characters escaped as `\uXXXX`.
///
/// Two `Value`s that are semantically equal (including differently-ordered
/// object keys) always render to the same string. `serde_json::Map` is a
/// `BTreeMap` in this workspace (the `preserve_order` feature is not
/// enabled), so keys are already insertion-independent; we still sort
/// explicitly at each level so the guarantee does not depend on that
/// feature flag staying off.
pub fn canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_escaped_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_escaped_string(key, out);
                out.push(':');
                write_value(&map[*key], out);
            }
            out.push('}');
        }
    }
}

fn write_escaped_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if c.is_ascii() => out.push(c),
            c => {
                let code = c as u32;
                if code <= 0xFFFF {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    // Encode as a UTF-16 surrogate pair, matching
                    // Python's `json.dumps(ensure_ascii=True)`.
                    let v = code - 0x10000;
                    let high = 0xD800 + (v >> 10);
                    let low = 0xDC00 + (v & 0x3FF);
                    out.push_str(&format!("\\u{:04x}\\u{:04x}", high, low));
                }
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_string(&a), canonical_string(&b));
        assert_eq!(canonical_string(&a), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let v = json!({"a": [1, 2, 3]});
        assert_eq!(canonical_string(&v), r#"{"a":[1,2,3]}"#);
    }

    #[test]
    fn escapes_non_ascii() {
        let v = json!("caf\u{e9}");
        assert_eq!(canonical_string(&v), r#""café""#);
    }

    #[test]
    fn nested_objects_sorted_recursively() {
        let a = json!({"outer": {"z": 1, "a": 2}, "first": true});
        assert_eq!(
            canonical_string(&a),
            r#"{"first":true,"outer":{"a":2,"z":1}}"#
        );
    }
}
