//! Recursive key-name normalization for notification payloads.
//!
//! The gateway has shipped camelCase, PascalCase and snake_case keys over the
//! years. Every payload is rewritten to snake_case once, at construction, so
//! the rest of the SDK only ever looks up one spelling.

use serde_json::{Map, Value};

/// Rewrite every object key in `value` to snake_case, at every depth.
///
/// Arrays are walked element by element; scalars are returned unchanged.
/// The input is never mutated.
///
/// # Examples
///
/// ```
/// use paygate_sdk::webhook::normalize_keys;
/// use serde_json::json;
///
/// let raw = json!({"orderId": "o-1", "Operation": {"operationStatus": "SUCCESS"}});
/// let normalized = normalize_keys(&raw);
///
/// assert_eq!(normalized["order_id"], "o-1");
/// assert_eq!(normalized["operation"]["operation_status"], "SUCCESS");
/// ```
pub fn normalize_keys(value: &Value) -> Value {
    normalize_keys_with(value, &to_snake_case)
}

/// Rewrite every object key in `value` with `case_fn`, at every depth.
pub fn normalize_keys_with(value: &Value, case_fn: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(case_fn(key), normalize_keys_with(inner, case_fn));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_keys_with(item, case_fn))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Convert a camelCase, PascalCase or kebab-case identifier to snake_case.
///
/// Acronym runs stay together: `HTTPStatus` becomes `http_status` and
/// `orderID` becomes `order_id`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }

        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
                {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
