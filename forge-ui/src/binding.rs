//! Prop binding resolution.
//!
//! Component props may carry two binding forms, both resolved against the
//! current data context before render:
//!
//! - a string wrapped in `{{ }}`, whose inner text is an expression
//! - a tagged object `{"type": "binding", "expression": ..., "fallback": ...}`
//!
//! Every other prop value passes through untouched, so resolving an already
//! resolved prop set returns it unchanged.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    expr::{
        EvalContext, ExprError, evaluate_condition, get_in_map, get_nested_value,
        template::{apply_string_operation, is_string_operation},
        try_evaluate_expression,
    },
    schema::{Binding, DataBindingRef, PropBinding},
    store::ComputeRegistry,
};

/// Callback notified when a binding expression cannot be evaluated.
pub type BindingErrorCallback<'a> = &'a dyn Fn(&ExprError, &str);

/// Resolves bindings against one data context. Pure: never mutates `data`.
#[derive(Clone, Copy)]
pub struct BindingResolver<'a> {
    data: &'a Map<String, Value>,
    computes: Option<&'a ComputeRegistry>,
    on_error: Option<BindingErrorCallback<'a>>,
}

impl<'a> BindingResolver<'a> {
    /// A resolver over `data` with no named transforms and no error hook.
    pub fn new(data: &'a Map<String, Value>) -> Self {
        Self {
            data,
            computes: None,
            on_error: None,
        }
    }

    /// Look binding transforms up in `computes` before treating them as expressions.
    pub fn with_computes(mut self, computes: &'a ComputeRegistry) -> Self {
        self.computes = Some(computes);
        self
    }

    /// Report evaluation failures to `callback` in addition to the log.
    pub fn with_on_error(mut self, callback: BindingErrorCallback<'a>) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// The data context bindings resolve against.
    pub fn data(&self) -> &'a Map<String, Value> {
        self.data
    }

    fn ctx(&self) -> EvalContext<'a> {
        EvalContext::new(self.data)
    }

    fn report(&self, error: &ExprError, expression: &str) {
        if let Some(cb) = self.on_error {
            cb(error, expression);
        }
    }

    /// Evaluate `expression`, substituting `fallback` when it fails.
    pub fn resolve_expression(&self, expression: &str, fallback: Option<Value>) -> Option<Value> {
        match try_evaluate_expression(expression, &self.ctx()) {
            Ok(v) => v,
            Err(e) => {
                self.report(&e, expression);
                warn!("Failed to resolve binding: {expression}: {e}");
                fallback
            }
        }
    }

    /// Resolve a single prop value. `None` means the prop is `undefined`.
    pub fn resolve_value(&self, value: &Value) -> Option<Value> {
        if let Value::String(s) = value
            && let Some(inner) = s.strip_prefix("{{").and_then(|r| r.strip_suffix("}}"))
        {
            return self.resolve_expression(inner.trim(), None);
        }

        if let Some(binding) = PropBinding::from_value(value) {
            return self.resolve_expression(&binding.expression, binding.fallback);
        }

        Some(value.clone())
    }

    /// Resolve every prop. Props resolving to `undefined` are dropped.
    pub fn resolve_props(&self, props: &Map<String, Value>) -> Map<String, Value> {
        props
            .iter()
            .filter_map(|(key, value)| self.resolve_value(value).map(|v| (key.clone(), v)))
            .collect()
    }

    /// Evaluate a condition string. Fails open.
    pub fn resolve_condition(&self, condition: &str) -> bool {
        evaluate_condition(condition, &self.ctx())
    }

    /// Follow a `{source, path, transform}` pointer.
    pub fn resolve_binding(&self, binding: &Binding) -> Option<Value> {
        let mut value = self.data.get(&binding.source).cloned();

        if let Some(path) = &binding.path {
            value = value.and_then(|v| get_nested_value(&v, path));
        }

        if let Some(transform) = &binding.transform {
            value = self.apply_transform(value, transform);
        }

        value
    }

    /// Resolve a `dataBinding` or `loop.source` reference.
    ///
    /// A string is a dotted path into the data context; an object is a
    /// [`Binding`].
    pub fn resolve_data_ref(&self, reference: &DataBindingRef) -> Option<Value> {
        match reference {
            DataBindingRef::Path(path) => get_in_map(self.data, path),
            DataBindingRef::Binding(binding) => self.resolve_binding(binding),
        }
    }

    /// Overwrite `props` with the values of a component's binding map.
    pub fn apply_bindings(&self, props: &mut Map<String, Value>, bindings: &BTreeMap<String, Binding>) {
        for (prop, binding) in bindings {
            match self.resolve_binding(binding) {
                Some(v) => {
                    props.insert(prop.clone(), v);
                }
                None => {
                    props.remove(prop);
                }
            }
        }
    }

    /// String operations apply directly, then registered transform
    /// functions. Anything else is an expression that sees the bound value as
    /// `data.value`; when it cannot be evaluated the value passes through.
    fn apply_transform(&self, value: Option<Value>, transform: &str) -> Option<Value> {
        if is_string_operation(transform) {
            return apply_string_operation(value, transform);
        }

        if let Some(f) = self.computes.and_then(|c| c.transform(transform)) {
            return value.as_ref().map(|v| f(v));
        }

        let mut scope = self.data.clone();
        match &value {
            Some(v) => scope.insert("value".to_string(), v.clone()),
            None => scope.remove("value"),
        };

        match try_evaluate_expression(transform, &EvalContext::new(&scope)) {
            Ok(v) => v,
            Err(e) => {
                self.report(&e, transform);
                warn!("Failed to transform data: {e}");
                value
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use serde_json::json;

    fn data() -> Map<String, Value> {
        json!({
            "user": {"name": "Ada", "email": " ADA@EXAMPLE.COM "},
            "todos": [{"id": 1, "completed": true}, {"id": 2, "completed": false}]
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_resolve_props_forms() {
        let d = data();
        let resolver = BindingResolver::new(&d);
        let props = json!({
            "title": "{{ data.user.name }}",
            "count": "{{length(data.todos)}}",
            "subtitle": {"type": "binding", "expression": "data.user.missing", "fallback": "n/a"},
            "broken": {"type": "binding", "expression": "1 +", "fallback": "n/a"},
            "plain": "hello",
            "gone": "{{ data.nothing }}",
            "nested": {"a": 1}
        });
        let out = resolver.resolve_props(props.as_object().unwrap());
        assert_eq!(out["title"], json!("Ada"));
        assert_eq!(out["count"], json!(2));
        // A missing path is not a failure, so the fallback is not used.
        assert!(!out.contains_key("subtitle"));
        assert_eq!(out["broken"], json!("n/a"));
        assert_eq!(out["plain"], json!("hello"));
        assert!(!out.contains_key("gone"));
        assert_eq!(out["nested"], json!({"a": 1}));
    }

    #[test]
    fn test_resolve_props_idempotent_on_plain_props() {
        let d = data();
        let resolver = BindingResolver::new(&d);
        let props = json!({"a": "x", "b": 2, "c": [1, 2], "d": {"type": "card"}, "e": "{not a binding}"});
        let once = resolver.resolve_props(props.as_object().unwrap());
        assert_eq!(&once, props.as_object().unwrap());
        assert_eq!(resolver.resolve_props(&once), once);
    }

    #[test]
    fn test_on_error_callback() {
        let d = data();
        let seen = RefCell::new(Vec::new());
        let cb = |e: &ExprError, expr: &str| seen.borrow_mut().push((e.clone(), expr.to_string()));
        let resolver = BindingResolver::new(&d).with_on_error(&cb);
        let out = resolver.resolve_value(&json!("{{ nonsense here }}"));
        assert_eq!(out, None);
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "nonsense here");
    }

    #[test]
    fn test_resolve_binding_with_path_and_transform() {
        let d = data();
        let resolver = BindingResolver::new(&d);
        assert_eq!(
            resolver.resolve_binding(&Binding::new("user").with_path("name")),
            Some(json!("Ada"))
        );

        let mut b = Binding::new("user").with_path("email");
        b.transform = Some("trim".into());
        assert_eq!(resolver.resolve_binding(&b), Some(json!("ADA@EXAMPLE.COM")));

        let mut b = Binding::new("todos");
        b.transform = Some("todoStats(data.value)".into());
        assert_eq!(
            resolver.resolve_binding(&b),
            Some(json!({"total": 2, "completed": 1, "remaining": 1}))
        );

        assert_eq!(resolver.resolve_binding(&Binding::new("ghost").with_path("x")), None);
    }

    #[test]
    fn test_apply_bindings_overrides_props() {
        let d = data();
        let resolver = BindingResolver::new(&d);
        let mut props = json!({"children": "static", "value": "old"}).as_object().unwrap().clone();
        let mut bindings = BTreeMap::new();
        bindings.insert("children".to_string(), Binding::new("user").with_path("name"));
        bindings.insert("value".to_string(), Binding::new("missing"));
        resolver.apply_bindings(&mut props, &bindings);
        assert_eq!(props["children"], json!("Ada"));
        assert!(!props.contains_key("value"));
    }

    #[test]
    fn test_named_transforms() {
        let users = json!({"users": [{"id": 1, "name": "Ada"}, {"id": 2, "name": "Bob"}]})
            .as_object()
            .unwrap()
            .clone();
        let computes = ComputeRegistry::builtin();
        let resolver = BindingResolver::new(&users).with_computes(&computes);

        let mut count = Binding::new("users");
        count.transform = Some("transformFilteredUsers".into());
        assert_eq!(resolver.resolve_binding(&count), Some(json!("2 users")));

        let mut cards = Binding::new("users");
        cards.transform = Some("transformUserList".into());
        let out = resolver.resolve_binding(&cards).unwrap();
        assert_eq!(out[1]["id"], json!("user-2"));

        // Without access to the registry the name is not a known expression.
        let plain = BindingResolver::new(&users);
        assert_eq!(plain.resolve_binding(&count), users.get("users").cloned());

        // Undefined stays undefined.
        let mut missing = Binding::new("nobody");
        missing.transform = Some("transformFilteredUsers".into());
        assert_eq!(resolver.resolve_binding(&missing), None);
    }

    #[test]
    fn test_unknown_transform_reports_and_passes_through() {
        let d = data();
        let seen = RefCell::new(Vec::new());
        let cb = |_: &ExprError, expr: &str| seen.borrow_mut().push(expr.to_string());
        let computes = ComputeRegistry::builtin();
        let resolver = BindingResolver::new(&d).with_computes(&computes).with_on_error(&cb);

        let mut b = Binding::new("user").with_path("name");
        b.transform = Some("shoutName".into());
        assert_eq!(resolver.resolve_binding(&b), Some(json!("Ada")));
        assert_eq!(seen.into_inner(), vec!["shoutName".to_string()]);
    }

    #[test]
    fn test_resolve_data_ref() {
        let d = data();
        let resolver = BindingResolver::new(&d);
        assert_eq!(
            resolver.resolve_data_ref(&DataBindingRef::Path("user.name".into())),
            Some(json!("Ada"))
        );
        assert_eq!(
            resolver.resolve_data_ref(&DataBindingRef::Path("todos".into())),
            d.get("todos").cloned()
        );
        assert_eq!(
            resolver.resolve_data_ref(&DataBindingRef::Binding(Binding::new("user").with_path("email"))),
            Some(json!(" ADA@EXAMPLE.COM "))
        );
        assert_eq!(resolver.resolve_data_ref(&DataBindingRef::Path("ghost.x".into())), None);
    }
}
