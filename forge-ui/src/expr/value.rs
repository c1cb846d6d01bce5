use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Number, Value};

/// JavaScript truthiness of an optional value (`None` is `undefined`).
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// JavaScript `Number(value)` coercion. `NaN` when there is no numeric reading.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_js_number(s).unwrap_or(f64::NAN),
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => match single {
                Value::Null => 0.0,
                Value::String(_) | Value::Number(_) | Value::Array(_) => to_number(Some(single)),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        },
        Some(Value::Object(_)) => f64::NAN,
    }
}

/// Parse a string the way JavaScript's `Number()` does.
///
/// Surrounding whitespace is ignored and a blank string is `0`. Returns `None`
/// where JavaScript would produce `NaN` or an infinity.
pub fn parse_js_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }

    // Rust accepts "inf" and "nan" spellings that JavaScript does not.
    if !t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }

    t.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Build a JSON number, preferring an integer representation.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// JavaScript `===` on optional values. Numbers compare by value.
pub fn strict_equals(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.as_f64() == y.as_f64(),
        // Arrays and objects compare by identity in JavaScript; structural
        // equality is the nearest owned-value reading.
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// JavaScript `String(value)`.
pub fn to_js_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => to_js_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// Length of a string in UTF-16 code units, as JavaScript reports it.
pub fn js_length(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!("0"))));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
    }

    #[test]
    fn test_parse_js_number() {
        assert_eq!(parse_js_number(" 12 "), Some(12.0));
        assert_eq!(parse_js_number(""), Some(0.0));
        assert_eq!(parse_js_number("0x10"), Some(16.0));
        assert_eq!(parse_js_number("1e3"), Some(1000.0));
        assert_eq!(parse_js_number("inf"), None);
        assert_eq!(parse_js_number("NaN"), None);
        assert_eq!(parse_js_number("12px"), None);
    }

    #[test]
    fn test_strict_equals_numbers() {
        assert!(strict_equals(Some(&json!(1)), Some(&json!(1.0))));
        assert!(!strict_equals(Some(&json!(1)), Some(&json!("1"))));
        assert!(!strict_equals(None, Some(&json!(null))));
    }

    #[test]
    fn test_to_js_string() {
        assert_eq!(to_js_string(Some(&json!(3.0))), "3");
        assert_eq!(to_js_string(Some(&json!([1, null, "a"]))), "1,,a");
        assert_eq!(to_js_string(None), "undefined");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(Some(&json!("5"))), 5.0);
        assert_eq!(to_number(Some(&json!([]))), 0.0);
        assert_eq!(to_number(Some(&json!(true))), 1.0);
        assert!(to_number(Some(&json!({}))).is_nan());
        assert!(to_number(None).is_nan());
    }
}
