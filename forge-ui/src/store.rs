//! Data source registry and the live data context.
//!
//! [`DataStore`] owns the declared [`DataSource`]s of a page together with the
//! current value of each source, keyed by source id. Every update is an
//! independent, immediately visible state transition: the new value is
//! stored, written through to the KV backend for `kv` sources, and all
//! `computed` sources are re-evaluated.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::{
    expr::{
        EvalContext, evaluate_condition, evaluate_expression, get_nested_value, is_truthy,
        set_nested_value,
        value::{js_length, now_millis, to_js_string},
    },
    kv::{KvError, KvStore},
    schema::{DataSource, DataSourceType},
};

/// Host function deriving a value from the data context and an optional event.
pub type ComputeFn = Arc<dyn Fn(&Map<String, Value>, Option<&Value>) -> Value + Send + Sync>;

/// Host function mapping one bound value to another, named by a binding `transform`.
pub type TransformFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Named compute functions referenced by `compute` fields of sources and
/// actions, by event handler conditions and by binding transforms.
#[derive(Clone, Default)]
pub struct ComputeRegistry {
    functions: BTreeMap<String, ComputeFn>,
    transforms: BTreeMap<String, TransformFn>,
}

impl fmt::Debug for ComputeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn eval(expr: &str, data: &Map<String, Value>, event: Option<&Value>) -> Option<Value> {
    evaluate_expression(expr, &EvalContext::new(data).with_event(event))
}

fn event_target_value(event: Option<&Value>) -> Value {
    match event.and_then(|e| get_nested_value(e, "target.value")) {
        Some(v) if is_truthy(Some(&v)) => v,
        _ => Value::String(String::new()),
    }
}

/// A bare identifier such as `checkCanAddTodo`, as opposed to a condition expression.
fn is_function_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn field_string(value: &Value, key: &str) -> String {
    to_js_string(value.get(key))
}

fn field(value: &Value, key: &str) -> Value {
    value.get(key).cloned().unwrap_or(Value::Null)
}

fn user_card(user: &Value) -> Value {
    let id = field_string(user, "id");
    let variant = if user.get("status").and_then(Value::as_str) == Some("active") {
        "default"
    } else {
        "secondary"
    };
    json!({
        "type": "Card",
        "id": format!("user-{id}"),
        "props": {
            "className": "bg-background/50 hover:bg-background/80 transition-colors border-l-4 border-l-primary"
        },
        "children": [{
            "type": "CardContent",
            "id": format!("user-content-{id}"),
            "props": {"className": "pt-6"},
            "children": [{
                "type": "div",
                "id": format!("user-row-{id}"),
                "props": {"className": "flex items-start justify-between"},
                "children": [
                    {
                        "type": "div",
                        "id": format!("user-info-{id}"),
                        "props": {"className": "flex-1"},
                        "children": [
                            {
                                "type": "div",
                                "id": format!("user-name-{id}"),
                                "props": {"className": "font-semibold text-lg mb-1", "children": field(user, "name")}
                            },
                            {
                                "type": "div",
                                "id": format!("user-email-{id}"),
                                "props": {"className": "text-sm text-muted-foreground", "children": field(user, "email")}
                            },
                            {
                                "type": "div",
                                "id": format!("user-joined-{id}"),
                                "props": {
                                    "className": "text-xs text-muted-foreground mt-2",
                                    "children": format!("Joined {}", field_string(user, "joined"))
                                }
                            }
                        ]
                    },
                    {
                        "type": "Badge",
                        "id": format!("user-status-{id}"),
                        "props": {"variant": variant, "children": field(user, "status")}
                    }
                ]
            }]
        }]
    })
}

impl ComputeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the compute functions used by the bundled page schemas.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        r.register("computeFilteredUsers", |data, _| {
            eval("filterUsersByQuery(data.users, data.filterQuery)", data, None)
                .unwrap_or_else(|| json!([]))
        });
        r.register("computeStats", |data, _| {
            eval("userStats(data.users)", data, None).unwrap_or(Value::Null)
        });
        r.register("computeTodoStats", |data, _| {
            eval("todoStats(data.todos)", data, None).unwrap_or(Value::Null)
        });
        r.register("computeAddTodo", |data, _| {
            let mut todo = Map::new();
            todo.insert("id".into(), Value::from(now_millis()));
            if let Some(text) = data.get("newTodo") {
                todo.insert("text".into(), text.clone());
            }
            todo.insert("completed".into(), Value::Bool(false));
            Value::Object(todo)
        });
        r.register("updateFilterQuery", |_, event| event_target_value(event));
        r.register("updateNewTodo", |_, event| event_target_value(event));
        r.register("checkCanAddTodo", |data, _| {
            let len = data
                .get("newTodo")
                .and_then(Value::as_str)
                .map(|s| s.trim().len())
                .unwrap_or(0);
            Value::Bool(len > 0)
        });

        r.register_transform("transformFilteredUsers", |users| {
            let count = match users {
                Value::Array(items) => items.len(),
                Value::String(s) => js_length(s),
                _ => 0,
            };
            Value::String(format!("{count} users"))
        });
        r.register_transform("transformUserList", |users| match users {
            Value::Array(items) => Value::Array(items.iter().map(user_card).collect()),
            _ => Value::Array(Vec::new()),
        });
        r
    }

    /// Add or replace the compute function `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Map<String, Value>, Option<&Value>) -> Value + Send + Sync + 'static,
    ) {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Add or replace the binding transform `name`.
    pub fn register_transform(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) {
        self.transforms.insert(name.into(), Arc::new(f));
    }

    /// The compute function `name`.
    pub fn get(&self, name: &str) -> Option<&ComputeFn> {
        self.functions.get(name)
    }

    pub fn transform(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    /// Names of the registered compute functions, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Check an event handler condition.
    ///
    /// A registered compute function name runs that function and uses the
    /// truthiness of its result. Any other bare name is `false`. Everything
    /// else is a condition expression for [`evaluate_condition`], which fails
    /// open.
    pub fn check_condition(&self, condition: &str, ctx: &EvalContext<'_>) -> bool {
        match condition {
            "true" => return true,
            "false" => return false,
            _ => {}
        }
        if let Some(f) = self.get(condition) {
            return is_truthy(Some(&f(ctx.data, ctx.event)));
        }
        if is_function_name(condition) {
            warn!("condition function \"{condition}\" not found, treating as false");
            return false;
        }
        evaluate_condition(condition, ctx)
    }
}

/// Data store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to persist data source `{source_id}`: {error}")]
    Persist {
        source_id: String,
        #[source]
        error: KvError,
    },
}

/// The data context of a page plus the sources that declare it.
pub struct DataStore {
    sources: Vec<DataSource>,
    data: Map<String, Value>,
    kv: Arc<dyn KvStore>,
    computes: ComputeRegistry,
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("sources", &self.sources)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl DataStore {
    /// Initialise every source.
    ///
    /// `kv` sources with a key read the KV backend, falling back to their
    /// default value when the key is absent or the read fails. `static`
    /// sources take their default value. `computed` sources are evaluated
    /// last, in declaration order.
    pub async fn load(
        sources: Vec<DataSource>,
        kv: Arc<dyn KvStore>,
        computes: ComputeRegistry,
    ) -> Self {
        let mut store = Self {
            sources: Vec::new(),
            data: Map::new(),
            kv,
            computes,
        };
        for ds in sources {
            store.init_source(&ds).await;
            store.sources.push(ds);
        }
        store.recompute();
        store
    }

    async fn init_source(&mut self, ds: &DataSource) {
        let value = match (ds.kind, &ds.key) {
            (DataSourceType::Kv, Some(key)) => match self.kv.get(key).await {
                Ok(Some(v)) => Some(v),
                Ok(None) => ds.default_value.clone(),
                Err(e) => {
                    warn!("failed to load kv source `{}`: {e}", ds.id);
                    ds.default_value.clone()
                }
            },
            (DataSourceType::Computed, _) => return,
            _ => ds.default_value.clone(),
        };
        if let Some(v) = value {
            self.data.insert(ds.id.clone(), v);
        }
    }

    /// The current data context, keyed by source id.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Current value of source `id`, `None` when it is undefined.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.data.get(id)
    }

    /// Declared sources, in declaration order.
    pub fn sources(&self) -> &[DataSource] {
        &self.sources
    }

    /// Declaration of source `id`.
    pub fn source(&self, id: &str) -> Option<&DataSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn computes(&self) -> &ComputeRegistry {
        &self.computes
    }

    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Replace the value of source `id`.
    ///
    /// The new value is visible immediately, even if the KV write-through
    /// fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persist`] when `id` is a `kv` source and the
    /// backend rejects the write.
    pub async fn update_data(&mut self, id: &str, value: Value) -> Result<(), StoreError> {
        debug!("update `{id}` = {value}");
        self.data.insert(id.to_string(), value.clone());
        self.recompute();

        if let Some(ds) = self.source(id)
            && ds.kind == DataSourceType::Kv
        {
            let key = ds.storage_key().to_string();
            self.kv
                .set(&key, value)
                .await
                .map_err(|error| StoreError::Persist {
                    source_id: id.to_string(),
                    error,
                })?;
        }
        Ok(())
    }

    /// Set a nested `path` inside source `id`, copying only the levels touched.
    ///
    /// # Errors
    ///
    /// See [`update_data`](Self::update_data).
    pub async fn update_path(&mut self, id: &str, path: &str, value: Value) -> Result<(), StoreError> {
        let current = self.data.get(id).cloned().unwrap_or(Value::Null);
        let updated = set_nested_value(current, path, value);
        self.update_data(id, updated).await
    }

    /// Re-evaluate every computed source once, in declaration order.
    ///
    /// There is no dependency ordering or cycle detection: a source that
    /// reads a computed source declared after it sees the previous value.
    pub fn recompute(&mut self) {
        for ds in &self.sources {
            if ds.kind != DataSourceType::Computed {
                continue;
            }
            let value = if let Some(name) = &ds.compute {
                match self.computes.get(name) {
                    Some(f) => Some(f(&self.data, None)),
                    None => {
                        warn!("unknown compute function `{name}` for source `{}`", ds.id);
                        continue;
                    }
                }
            } else if let Some(expr) = &ds.expression {
                eval(expr, &self.data, None)
            } else {
                ds.default_value.clone()
            };

            match value {
                Some(v) => {
                    self.data.insert(ds.id.clone(), v);
                }
                None => {
                    self.data.remove(&ds.id);
                }
            }
        }
    }

    /// Declare a new source and initialise it.
    pub async fn add_source(&mut self, ds: DataSource) {
        self.init_source(&ds).await;
        self.sources.push(ds);
        self.recompute();
    }

    /// Remove a source and its value.
    ///
    /// Removal is not blocked when other sources depend on it; check
    /// [`dependents_of`](Self::dependents_of) first where that matters.
    pub fn remove_source(&mut self, id: &str) -> Option<DataSource> {
        let idx = self.sources.iter().position(|s| s.id == id)?;
        let dependents = self.dependents_of(id);
        if !dependents.is_empty() {
            debug!("removing `{id}` still referenced by {dependents:?}");
        }
        self.data.remove(id);
        let removed = self.sources.remove(idx);
        self.recompute();
        Some(removed)
    }

    /// Ids of sources listing `id` among their dependencies.
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.dependencies.iter().any(|d| d == id))
            .map(|s| s.id.clone())
            .collect()
    }
}
