//! Closed-form expression evaluation.
//!
//! Expressions are not parsed by a grammar. An expression string is matched
//! against a fixed, ordered list of recognised forms:
//!
//! 1. `Name(arg, ...)` for a name in the [function registry](functions)
//! 2. the bare words `event` and `data`
//! 3. `data.<path>` and `event.<path>` lookups
//! 4. `Date.now()`
//! 5. quoted string literals
//! 6. numeric literals
//! 7. `true`, `false`, `null`, `undefined`
//!
//! Anything else is returned unchanged by [`evaluate_expression`]. Results are
//! `Option<Value>`: `None` plays the role of `undefined` and is distinct from
//! `Some(Value::Null)`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Quote-aware argument splitting for function calls.
pub mod args;

/// Condition pattern matching.
pub mod condition;

/// Built-in expression functions.
pub mod functions;

/// Dotted path lookups and copy-on-write updates.
pub mod path;

/// Template objects and string operations.
pub mod template;

/// JavaScript-compatible value coercions.
pub mod value;

pub use condition::evaluate_condition;
pub use path::{get_in_map, get_nested_value, set_nested_value};
pub use template::{apply_string_operation, evaluate_template};
pub use value::{is_truthy, strict_equals, to_number};

/// Data visible to an expression.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The data context, keyed by data source id.
    pub data: &'a Map<String, Value>,
    /// Payload of the event being handled, if any.
    pub event: Option<&'a Value>,
}

impl<'a> EvalContext<'a> {
    /// A context over `data` with no event.
    pub fn new(data: &'a Map<String, Value>) -> Self {
        Self { data, event: None }
    }

    /// Expose `event` to `event` and `event.<path>` expressions.
    pub fn with_event(mut self, event: Option<&'a Value>) -> Self {
        self.event = event;
        self
    }
}

/// Expression evaluation failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    /// The expression matched none of the recognised forms.
    #[error("expression `{0}` could not be evaluated")]
    Unrecognized(String),
}

static FUNCTION_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$]*)\((.*)\)$").expect("function call pattern")
});

/// Evaluate `expression`, returning it unchanged when it is not recognised.
///
/// Never fails: missing path segments yield `None`.
pub fn evaluate_expression(expression: &str, ctx: &EvalContext<'_>) -> Option<Value> {
    match try_evaluate_expression(expression, ctx) {
        Ok(v) => v,
        Err(_) => {
            warn!("Expression \"{expression}\" could not be evaluated, returning as-is");
            Some(Value::String(expression.to_string()))
        }
    }
}

/// Evaluate `expression`, reporting unrecognised input as an error.
pub fn try_evaluate_expression(
    expression: &str,
    ctx: &EvalContext<'_>,
) -> Result<Option<Value>, ExprError> {
    if expression.is_empty() {
        return Ok(None);
    }

    if let Some(caps) = FUNCTION_CALL.captures(expression)
        && let Some(handler) = functions::lookup(&caps[1])
    {
        let args = args::split_arguments(&caps[2])
            .iter()
            .map(|arg| evaluate_expression(arg, ctx))
            .collect::<Vec<_>>();
        return Ok(handler(&args, ctx));
    }

    match expression {
        "event" => return Ok(ctx.event.cloned()),
        "data" => return Ok(Some(Value::Object(ctx.data.clone()))),
        _ => {}
    }

    if let Some(path) = expression.strip_prefix("data.") {
        return Ok(get_in_map(ctx.data, path));
    }

    if let Some(path) = expression.strip_prefix("event.") {
        return Ok(ctx.event.and_then(|e| get_nested_value(e, path)));
    }

    if expression == "Date.now()" {
        return Ok(Some(Value::from(value::now_millis())));
    }

    if let Some(lit) = quoted(expression, '"').or_else(|| quoted(expression, '\'')) {
        return Ok(Some(Value::String(lit.to_string())));
    }

    if let Some(n) = value::parse_js_number(expression) {
        return Ok(Some(value::number_value(n)));
    }

    match expression {
        "true" => Ok(Some(Value::Bool(true))),
        "false" => Ok(Some(Value::Bool(false))),
        "null" => Ok(Some(Value::Null)),
        "undefined" => Ok(None),
        _ => Err(ExprError::Unrecognized(expression.to_string())),
    }
}

fn quoted(s: &str, quote: char) -> Option<&str> {
    if !(s.starts_with(quote) && s.ends_with(quote)) {
        return None;
    }
    if s.len() < 2 {
        return Some("");
    }
    Some(&s[1..s.len() - 1])
}
