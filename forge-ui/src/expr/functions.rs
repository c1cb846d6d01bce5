//! The fixed registry of functions callable from expressions.
//!
//! Every function tolerates wrongly typed arguments and returns its empty or
//! zero default instead of failing.

use serde_json::{Value, json};

use super::{
    EvalContext, evaluate_expression,
    path::get_nested_value,
    value::{is_truthy, js_length, now_millis, strict_equals, to_js_string, to_number},
};

/// Signature of an expression function. `None` arguments are `undefined`.
pub type ExprFunction = fn(&[Option<Value>], &EvalContext<'_>) -> Option<Value>;

static FUNCTIONS: &[(&str, ExprFunction)] = &[
    ("findById", find_by_id),
    ("findByIdOrFirst", find_by_id_or_first),
    ("length", length),
    ("keyCount", key_count),
    ("sumByLength", sum_by_length),
    ("isRecentTimestamp", is_recent_timestamp),
    ("timeAgo", time_ago),
    ("filterUsersByQuery", filter_users_by_query),
    ("userStats", user_stats),
    ("todoStats", todo_stats),
];

const DEFAULT_RECENT_THRESHOLD_MS: f64 = 3000.0;

/// Find a registered function by name.
pub fn lookup(name: &str) -> Option<ExprFunction> {
    FUNCTIONS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

/// Names of all registered functions.
pub fn supported_functions() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|(n, _)| *n)
}

fn arg(args: &[Option<Value>], idx: usize) -> Option<&Value> {
    args.get(idx).and_then(Option::as_ref)
}

fn array_arg(args: &[Option<Value>], idx: usize) -> Option<&Vec<Value>> {
    arg(args, idx).and_then(Value::as_array)
}

fn item_field<'a>(item: &'a Value, field: &str) -> Option<&'a Value> {
    item.as_object().and_then(|m| m.get(field))
}

fn find_item<'a>(list: &'a [Value], id: Option<&Value>) -> Option<&'a Value> {
    list.iter().find(|item| strict_equals(item_field(item, "id"), id))
}

fn find_by_id(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let Some(list) = array_arg(args, 0) else {
        return Some(Value::Null);
    };
    Some(find_item(list, arg(args, 1)).cloned().unwrap_or(Value::Null))
}

fn find_by_id_or_first(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let Some(list) = array_arg(args, 0) else {
        return Some(Value::Null);
    };
    let found = find_item(list, arg(args, 1)).or_else(|| list.first());
    Some(found.cloned().unwrap_or(Value::Null))
}

fn length(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let n = match arg(args, 0) {
        Some(Value::Array(items)) => items.len(),
        Some(Value::String(s)) => js_length(s),
        Some(Value::Object(m)) => m.len(),
        _ => 0,
    };
    Some(Value::from(n))
}

fn key_count(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let n = match arg(args, 0) {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(m)) => m.len(),
        _ => 0,
    };
    Some(Value::from(n))
}

fn sum_by_length(args: &[Option<Value>], ctx: &EvalContext<'_>) -> Option<Value> {
    let Some(list) = array_arg(args, 0) else {
        return Some(Value::from(0));
    };
    let path = match arg(args, 1) {
        Some(Value::String(s)) => Some(Value::String(s.clone())),
        other => evaluate_expression(&to_js_string(other), ctx),
    };
    let Some(Value::String(path)) = path.filter(|p| is_truthy(Some(p))) else {
        return Some(Value::from(0));
    };

    let total: usize = list
        .iter()
        .map(|item| match get_nested_value(item, &path) {
            Some(Value::Array(items)) => items.len(),
            Some(Value::String(s)) => js_length(&s),
            _ => 0,
        })
        .sum();
    Some(Value::from(total))
}

fn numeric_or(args: &[Option<Value>], idx: usize, default: f64) -> f64 {
    match arg(args, idx) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        _ => default,
    }
}

fn is_recent_timestamp(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let last = arg(args, 0);
    if !is_truthy(last) {
        return Some(Value::Bool(false));
    }
    let now = numeric_or(args, 1, now_millis() as f64);
    let threshold = numeric_or(args, 2, DEFAULT_RECENT_THRESHOLD_MS);
    Some(Value::Bool(now - to_number(last) < threshold))
}

fn time_ago(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let last = arg(args, 0);
    if !is_truthy(last) {
        return Some(Value::String(String::new()));
    }
    let now = numeric_or(args, 1, now_millis() as f64);
    let seconds = ((now - to_number(last)) / 1000.0).floor();

    let text = if seconds.is_nan() {
        String::new()
    } else if seconds < 60.0 {
        "just now".to_string()
    } else if seconds < 3600.0 {
        format!("{}m ago", (seconds / 60.0).floor())
    } else if seconds < 86400.0 {
        format!("{}h ago", (seconds / 3600.0).floor())
    } else {
        format!("{}d ago", (seconds / 86400.0).floor())
    };
    Some(Value::String(text))
}

fn lower_field(item: &Value, field: &str) -> String {
    match item_field(item, field) {
        None | Some(Value::Null) => String::new(),
        other => to_js_string(other).to_lowercase(),
    }
}

fn filter_users_by_query(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let list = array_arg(args, 0).cloned().unwrap_or_default();
    let query = match arg(args, 1) {
        Some(Value::String(s)) => s.to_lowercase(),
        _ => String::new(),
    };
    if query.is_empty() {
        return Some(Value::Array(list));
    }

    let filtered = list
        .into_iter()
        .filter(|user| {
            lower_field(user, "name").contains(&query) || lower_field(user, "email").contains(&query)
        })
        .collect();
    Some(Value::Array(filtered))
}

fn count_where(list: &[Value], pred: impl Fn(&Value) -> bool) -> usize {
    list.iter().filter(|v| pred(v)).count()
}

fn user_stats(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let empty = Vec::new();
    let list = array_arg(args, 0).unwrap_or(&empty);
    let status_is = |s: &'static str| {
        move |u: &Value| item_field(u, "status").and_then(Value::as_str) == Some(s)
    };
    Some(json!({
        "total": list.len(),
        "active": count_where(list, status_is("active")),
        "inactive": count_where(list, status_is("inactive")),
    }))
}

fn todo_stats(args: &[Option<Value>], _: &EvalContext<'_>) -> Option<Value> {
    let empty = Vec::new();
    let list = array_arg(args, 0).unwrap_or(&empty);
    let completed = count_where(list, |t| is_truthy(item_field(t, "completed")));
    Some(json!({
        "total": list.len(),
        "completed": completed,
        "remaining": list.len() - completed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn call(name: &str, args: Vec<Option<Value>>) -> Option<Value> {
        let data = Map::new();
        let ctx = EvalContext::new(&data);
        lookup(name).unwrap()(&args, &ctx)
    }

    #[test]
    fn test_registry_is_closed() {
        let names: Vec<_> = supported_functions().collect();
        assert_eq!(names.len(), 10);
        assert!(lookup("todoStats").is_some());
        assert!(lookup("eval").is_none());
    }

    #[test]
    fn test_find_by_id() {
        let list = json!([{"id": "a", "n": 1}, {"id": "b", "n": 2}]);
        assert_eq!(
            call("findById", vec![Some(list.clone()), Some(json!("b"))]),
            Some(json!({"id": "b", "n": 2}))
        );
        assert_eq!(call("findById", vec![Some(list.clone()), Some(json!("z"))]), Some(Value::Null));
        assert_eq!(call("findById", vec![Some(json!("nope")), Some(json!("a"))]), Some(Value::Null));
        assert_eq!(
            call("findByIdOrFirst", vec![Some(list), Some(json!("z"))]),
            Some(json!({"id": "a", "n": 1}))
        );
        assert_eq!(call("findByIdOrFirst", vec![Some(json!([])), None]), Some(Value::Null));
    }

    #[test]
    fn test_length_and_key_count() {
        assert_eq!(call("length", vec![Some(json!([1, 2, 3]))]), Some(json!(3)));
        assert_eq!(call("length", vec![Some(json!("héllo"))]), Some(json!(5)));
        assert_eq!(call("length", vec![Some(json!({"a": 1}))]), Some(json!(1)));
        assert_eq!(call("length", vec![Some(json!(12))]), Some(json!(0)));
        assert_eq!(call("length", vec![None]), Some(json!(0)));
        assert_eq!(call("keyCount", vec![Some(json!("abc"))]), Some(json!(0)));
        assert_eq!(call("keyCount", vec![Some(json!({"a": 1, "b": 2}))]), Some(json!(2)));
    }

    #[test]
    fn test_sum_by_length() {
        let list = json!([{"files": [1, 2]}, {"files": "abc"}, {"files": 4}, {}]);
        assert_eq!(call("sumByLength", vec![Some(list.clone()), Some(json!("files"))]), Some(json!(5)));
        assert_eq!(call("sumByLength", vec![Some(list), None]), Some(json!(0)));
        assert_eq!(call("sumByLength", vec![Some(json!({})), Some(json!("files"))]), Some(json!(0)));
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            call("isRecentTimestamp", vec![Some(json!(1000)), Some(json!(2500))]),
            Some(json!(true))
        );
        assert_eq!(
            call("isRecentTimestamp", vec![Some(json!(1000)), Some(json!(5000)), Some(json!(1000))]),
            Some(json!(false))
        );
        assert_eq!(call("isRecentTimestamp", vec![None]), Some(json!(false)));

        let now = 10_000_000;
        let ago = |ms: i64| call("timeAgo", vec![Some(json!(now - ms)), Some(json!(now))]);
        assert_eq!(ago(5_000), Some(json!("just now")));
        assert_eq!(ago(120_000), Some(json!("2m ago")));
        assert_eq!(ago(7_200_000), Some(json!("2h ago")));
        assert_eq!(call("timeAgo", vec![Some(json!(0))]), Some(json!("")));
    }

    #[test]
    fn test_filter_users_by_query() {
        let users = json!([
            {"name": "Ada Lovelace", "email": "ada@example.com"},
            {"name": "Alan Turing", "email": "alan@example.com"}
        ]);
        let hit = call("filterUsersByQuery", vec![Some(users.clone()), Some(json!("TURING"))]).unwrap();
        assert_eq!(hit.as_array().unwrap().len(), 1);
        let all = call("filterUsersByQuery", vec![Some(users), Some(json!(""))]).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(call("filterUsersByQuery", vec![None, Some(json!("x"))]), Some(json!([])));
    }

    #[test]
    fn test_stats() {
        let users = json!([{"status": "active"}, {"status": "inactive"}, {"status": "active"}]);
        assert_eq!(
            call("userStats", vec![Some(users)]),
            Some(json!({"total": 3, "active": 2, "inactive": 1}))
        );
        assert_eq!(
            call("todoStats", vec![Some(json!("oops"))]),
            Some(json!({"total": 0, "completed": 0, "remaining": 0}))
        );
    }
}
