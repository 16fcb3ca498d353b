//! Recursive removal of empty fields from contract payloads.

use serde_json::{Map, Value};

/// Strip every empty or invalid field from a payload tree.
///
/// Mappings are rebuilt key by key: a child is sanitized first and the key is
/// kept only when the sanitized child is still [`is_valid`]. A nested mapping
/// that ends up empty is therefore dropped along with its key.
///
/// Any other value, arrays included, is returned as-is. Arrays are leaves and
/// their elements are not inspected.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        other => other.clone(),
    }
}

fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter_map(|(key, child)| {
            let next = sanitize(child);
            is_valid(&next).then(|| (key.clone(), next))
        })
        .collect()
}

/// Whether a value survives sanitization.
///
/// Empty strings, `null`, `false`, empty mappings and non-finite numbers are
/// invalid. Every finite number is valid, `0` included.
pub fn is_valid(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(f64::is_finite),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) => true,
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_drops_empty_fields() {
        let raw = json!({
            "a": "",
            "b": 0,
            "c": null,
            "d": false,
            "e": {},
            "f": { "g": 1 }
        });

        assert_eq!(sanitize(&raw), json!({ "b": 0, "f": { "g": 1 } }));
    }

    #[test]
    fn test_sanitize_drops_mapping_emptied_by_recursion() {
        let raw = json!({
            "mint": { "minter": null, "cap": null },
            "name": "Test Token"
        });

        assert_eq!(sanitize(&raw), json!({ "name": "Test Token" }));
    }

    #[test]
    fn test_sanitize_keeps_arrays_untouched() {
        let raw = json!({
            "initial_balances": [{ "address": "", "amount": "0" }],
            "proof": []
        });

        assert_eq!(sanitize(&raw), raw);
    }

    #[test]
    fn test_sanitize_keeps_true_and_negative_numbers() {
        let raw = json!({ "enabled": true, "offset": -3, "rate": 0.5 });
        assert_eq!(sanitize(&raw), raw);
    }

    #[test]
    fn test_sanitize_non_mapping_is_identity() {
        assert_eq!(sanitize(&Value::Null), Value::Null);
        assert_eq!(sanitize(&json!("")), json!(""));
        assert_eq!(sanitize(&json!([null, {}])), json!([null, {}]));
    }

    #[test]
    fn test_sanitize_preserves_key_order() {
        let raw = json!({ "z": 1, "a": 2, "m": { "y": "x", "b": "" } });
        let keys: Vec<_> = sanitize(&raw)
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            json!({ "a": { "b": { "c": {} } }, "d": [1, 2], "e": "x" }),
            json!({ "set_worker": { "worker": "juno1presale" } }),
            json!({ "nested": { "empty": "", "zero": 0, "off": false } }),
            json!(42),
        ];

        for sample in samples {
            let once = sanitize(&sample);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_sanitize_does_not_mutate_input() {
        let raw = json!({ "a": "", "b": 1 });
        let copy = raw.clone();
        let _ = sanitize(&raw);
        assert_eq!(raw, copy);
    }
}
