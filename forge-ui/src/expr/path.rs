use serde_json::{Map, Value};

use super::value::{is_truthy, js_length};

/// Look up a dotted `path` inside `root`.
///
/// A falsy root or an empty path yields `None`, as does any missing or
/// `null` intermediate. Arrays accept numeric segments and `length`; strings
/// accept `length`.
pub fn get_nested_value(root: &Value, path: &str) -> Option<Value> {
    if !is_truthy(Some(root)) || path.is_empty() {
        return None;
    }
    walk(root, path.split('.'))
}

/// [`get_nested_value`] rooted at a data context map.
pub fn get_in_map(data: &Map<String, Value>, path: &str) -> Option<Value> {
    if path.is_empty() {
        return None;
    }
    let mut segments = path.split('.');
    let first = segments.next()?;
    let head = data.get(first)?;
    walk(head, segments)
}

fn walk<'a>(start: &Value, segments: impl Iterator<Item = &'a str>) -> Option<Value> {
    let mut segments = segments.peekable();
    let mut current = start;

    while let Some(seg) = segments.next() {
        let last = segments.peek().is_none();
        match current {
            Value::Null => return None,
            Value::Object(m) => current = m.get(seg)?,
            Value::Array(items) => {
                if seg == "length" {
                    return last.then(|| Value::from(items.len()));
                }
                current = items.get(seg.parse::<usize>().ok()?)?;
            }
            Value::String(s) => {
                if seg == "length" && last {
                    return Some(Value::from(js_length(s)));
                }
                if let Ok(idx) = seg.parse::<usize>()
                    && last
                {
                    return s.chars().nth(idx).map(|c| Value::String(c.to_string()));
                }
                return None;
            }
            Value::Bool(_) | Value::Number(_) => return None,
        }
    }

    Some(current.clone())
}

/// Set `value` at the dotted `path` inside `root`, returning the new root.
///
/// Only the containers along the path are touched. Missing or non-container
/// intermediates are replaced by empty objects; an array intermediate is
/// indexed when the segment is an in-range index.
pub fn set_nested_value(root: Value, path: &str, value: Value) -> Value {
    if path.is_empty() {
        return value;
    }
    let segments: Vec<&str> = path.split('.').collect();
    set_in(root, &segments, value)
}

fn set_in(current: Value, segments: &[&str], value: Value) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };

    match current {
        Value::Array(mut items) => {
            if let Ok(idx) = head.parse::<usize>()
                && idx < items.len()
            {
                let child = std::mem::take(&mut items[idx]);
                items[idx] = set_in(child, rest, value);
                return Value::Array(items);
            }
            set_in(Value::Object(Map::new()), segments, value)
        }
        Value::Object(mut map) => {
            let child = map.remove(*head).unwrap_or(Value::Null);
            let child = if rest.is_empty() {
                value
            } else {
                set_in(child, rest, value)
            };
            map.insert(head.to_string(), child);
            Value::Object(map)
        }
        _ => set_in(Value::Object(Map::new()), segments, value),
    }
}
