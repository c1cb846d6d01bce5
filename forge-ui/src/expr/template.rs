use serde_json::{Map, Value};

use super::{EvalContext, evaluate_expression, value::{js_length, to_js_string}};

/// Evaluate every string field of `template` as an expression.
///
/// Non-string fields are copied as they are. Fields whose expression
/// evaluates to `undefined` are left out of the result.
///
/// ```
/// use forge_ui::expr::{EvalContext, evaluate_template};
/// use serde_json::json;
///
/// let data = json!({"newTodo": "buy milk"}).as_object().unwrap().clone();
/// let template = json!({"text": "data.newTodo", "completed": false});
/// let out = evaluate_template(template.as_object().unwrap(), &EvalContext::new(&data));
/// assert_eq!(out["text"], json!("buy milk"));
/// assert_eq!(out["completed"], json!(false));
/// ```
pub fn evaluate_template(template: &Map<String, Value>, ctx: &EvalContext<'_>) -> Map<String, Value> {
    let mut result = Map::new();
    for (key, value) in template {
        match value {
            Value::String(expr) => {
                if let Some(v) = evaluate_expression(expr, ctx) {
                    result.insert(key.clone(), v);
                }
            }
            other => {
                result.insert(key.clone(), other.clone());
            }
        }
    }
    result
}

/// Apply a named string operation: `trim`, `toLowerCase`, `toUpperCase` or `length`.
///
/// `None` and `null` pass through. Unknown operations log a warning and
/// return the value unchanged.
pub fn apply_string_operation(value: Option<Value>, operation: &str) -> Option<Value> {
    let v = match value {
        None => return None,
        Some(Value::Null) => return Some(Value::Null),
        Some(v) => v,
    };

    let s = to_js_string(Some(&v));
    match operation {
        "trim" => Some(Value::String(s.trim().to_string())),
        "toLowerCase" => Some(Value::String(s.to_lowercase())),
        "toUpperCase" => Some(Value::String(s.to_uppercase())),
        "length" => Some(Value::from(js_length(&s))),
        _ => {
            warn!("Unknown string operation: {operation}");
            Some(v)
        }
    }
}

/// Whether `name` is one of the operations [`apply_string_operation`] knows.
pub fn is_string_operation(name: &str) -> bool {
    matches!(name, "trim" | "toLowerCase" | "toUpperCase" | "length")
}
