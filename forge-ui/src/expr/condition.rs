use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{
    EvalContext,
    path::get_in_map,
    value::{js_length, parse_js_number, to_number},
};

static GREATER_THAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data\.([a-zA-Z0-9_.]+)\s*>\s*(.+)$").expect("greater-than pattern")
});

static LENGTH_GREATER_THAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data\.([a-zA-Z0-9_.]+)\.length\s*>\s*(.+)$").expect("length pattern")
});

static EQUALS_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^data\.([a-zA-Z0-9_.]+)\s*===\s*['"](.+)['"]$"#).expect("equality pattern")
});

static NOT_NULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data\.([a-zA-Z0-9_.]+)\s*!=\s*null$").expect("null-check pattern")
});

/// Evaluate a visibility condition.
///
/// Recognised shapes, tried in order:
///
/// - `data.x > n` (a missing value counts as `0`)
/// - `data.x.length > n`
/// - `data.x === 'literal'`
/// - `data.x != null`
///
/// An empty condition is `true`. Any other condition logs a warning and is
/// `true` as well: conditions fail open.
pub fn evaluate_condition(condition: &str, ctx: &EvalContext<'_>) -> bool {
    if condition.is_empty() {
        return true;
    }

    if let Some(caps) = GREATER_THAN.captures(condition) {
        let value = get_in_map(ctx.data, &caps[1]).unwrap_or(Value::from(0));
        return to_number(Some(&value)) > threshold(&caps[2]);
    }

    if let Some(caps) = LENGTH_GREATER_THAN.captures(condition) {
        let len = match get_in_map(ctx.data, &caps[1]) {
            Some(Value::Array(items)) => items.len() as f64,
            Some(Value::String(s)) => js_length(&s) as f64,
            _ => 0.0,
        };
        return len > threshold(&caps[2]);
    }

    if let Some(caps) = EQUALS_LITERAL.captures(condition) {
        return get_in_map(ctx.data, &caps[1]).as_ref().and_then(Value::as_str) == Some(&caps[2]);
    }

    if let Some(caps) = NOT_NULL.captures(condition) {
        return !matches!(get_in_map(ctx.data, &caps[1]), None | Some(Value::Null));
    }

    warn!("Condition \"{condition}\" could not be evaluated, defaulting to true");
    true
}

fn threshold(s: &str) -> f64 {
    parse_js_number(s).unwrap_or(f64::NAN)
}
