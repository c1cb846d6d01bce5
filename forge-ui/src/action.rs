//! Declarative action dispatch.
//!
//! [`ActionExecutor`] interprets [`Action`]s against a [`DataStore`]. Side
//! effects that leave the engine (toasts, navigation, custom handlers) go
//! through the [`UiServices`] capability object supplied by the host.

use std::{borrow::Cow, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    expr::{
        EvalContext, evaluate_expression, evaluate_template, get_in_map,
        get_nested_value, is_truthy, strict_equals, to_number, value::number_value,
    },
    render::BoundHandler,
    schema::{Action, ActionType, ToastVariant},
    store::{DataStore, StoreError},
};

/// Receives user notifications.
pub trait Notifier: Send + Sync {
    /// Show a transient message.
    fn toast(&self, variant: ToastVariant, message: &str);
}

/// Receives navigation requests (the location hash).
pub trait Navigator: Send + Sync {
    /// Move to `path`, e.g. `#/settings`.
    fn navigate(&self, path: &str);
}

/// Host handler for `custom` actions.
#[async_trait]
pub trait CustomActionHandler: Send + Sync {
    async fn execute(
        &self,
        action: &Action,
        event: Option<&Value>,
        store: &mut DataStore,
    ) -> anyhow::Result<()>;
}

/// Capabilities the dispatcher may use.
#[derive(Clone)]
pub struct UiServices {
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub custom: Option<Arc<dyn CustomActionHandler>>,
}

impl UiServices {
    /// Services without a custom action handler.
    pub fn new(notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            notifier,
            navigator,
            custom: None,
        }
    }

    /// Route `custom` actions to `handler`.
    pub fn with_custom(mut self, handler: Arc<dyn CustomActionHandler>) -> Self {
        self.custom = Some(handler);
        self
    }
}

/// Failure while dispatching one action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown compute function `{0}`")]
    UnknownCompute(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("custom action `{id}` failed: {source}")]
    Custom {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Dispatches actions against one data store.
pub struct ActionExecutor<'a> {
    store: &'a mut DataStore,
    services: &'a UiServices,
    locals: Map<String, Value>,
}

impl<'a> ActionExecutor<'a> {
    /// An executor writing to `store` with no repeat locals in scope.
    pub fn new(store: &'a mut DataStore, services: &'a UiServices) -> Self {
        Self {
            store,
            services,
            locals: Map::new(),
        }
    }

    /// The store as left by the actions run so far.
    pub fn store(&self) -> &DataStore {
        self.store
    }

    /// Run one action. Errors are logged and surfaced as an error toast.
    pub async fn execute_action(&mut self, action: &Action, event: Option<&Value>) {
        if let Err(e) = self.try_execute_action(action, event).await {
            error!("Action execution failed: `{}`: {e}", action.id);
            self.services.notifier.toast(ToastVariant::Error, "Action failed");
        }
    }

    /// Run `actions` strictly in order, each seeing the previous one's writes.
    pub async fn execute_actions(&mut self, actions: &[Action], event: Option<&Value>) {
        for action in actions {
            self.execute_action(action, event).await;
        }
    }

    /// Run a bound event handler with its repeat locals in scope.
    ///
    /// The condition may name a registered compute function, see
    /// [`ComputeRegistry::check_condition`](crate::ComputeRegistry::check_condition).
    /// Returns `false` when the condition kept the handler from running.
    pub async fn execute_handler(&mut self, handler: &BoundHandler, event: Option<&Value>) -> bool {
        self.locals = handler.locals.clone();
        let allowed = match &handler.condition {
            Some(cond) => {
                let scope = self.scope();
                let ctx = EvalContext::new(&scope).with_event(event);
                self.store.computes().check_condition(cond, &ctx)
            }
            None => true,
        };
        if allowed {
            self.execute_actions(&handler.actions, event).await;
        } else {
            debug!("handler `{}` skipped by condition", handler.event);
        }
        self.locals.clear();
        allowed
    }

    /// Run one action, reporting failure to the caller instead of the notifier.
    ///
    /// # Errors
    ///
    /// Fails on an unknown `compute` name, a rejected KV write-through or a
    /// failing custom handler. Writes made before the failure are kept.
    pub async fn try_execute_action(
        &mut self,
        action: &Action,
        event: Option<&Value>,
    ) -> Result<(), ActionError> {
        debug!("execute {:?} `{}`", action.kind, action.id);
        match action.kind {
            ActionType::Create => {
                let Some(target) = self.target(action) else {
                    return Ok(());
                };
                let mut items = match self.current(target) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                items.push(self.resolve_value(action, event)?.unwrap_or(Value::Null));
                self.write(target, Value::Array(items)).await?;
            }
            ActionType::Update | ActionType::SetValue => {
                let Some(target) = self.target(action) else {
                    return Ok(());
                };
                let value = self.resolve_value(action, event)?.unwrap_or(Value::Null);
                self.write(target, value).await?;
            }
            ActionType::Delete => {
                let Some(target) = self.target(action) else {
                    return Ok(());
                };
                let needle = self.resolve_value(action, event)?;
                if !is_truthy(needle.as_ref()) {
                    debug!("delete `{}` has no value, skipped", action.id);
                    return Ok(());
                }
                let items = match self.current(target) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                let kept = items
                    .into_iter()
                    .filter(|item| {
                        let candidate = match &action.path {
                            Some(path) => get_nested_value(item, path),
                            None => Some(item.clone()),
                        };
                        !strict_equals(candidate.as_ref(), needle.as_ref())
                    })
                    .collect();
                self.write(target, Value::Array(kept)).await?;
            }
            ActionType::ToggleValue => {
                let Some(target) = self.target(action) else {
                    return Ok(());
                };
                let current = self.current(target);
                self.write(target, Value::Bool(!is_truthy(current.as_ref())))
                    .await?;
            }
            ActionType::Increment | ActionType::Decrement => {
                let Some(target) = self.target(action) else {
                    return Ok(());
                };
                let current = match self.current(target) {
                    Some(v) if is_truthy(Some(&v)) => to_number(Some(&v)),
                    _ => 0.0,
                };
                let amount = match self.resolve_value(action, event)? {
                    Some(v) if is_truthy(Some(&v)) => to_number(Some(&v)),
                    _ => 1.0,
                };
                let next = if action.kind == ActionType::Increment {
                    current + amount
                } else {
                    current - amount
                };
                self.write(target, number_value(next)).await?;
            }
            ActionType::ShowToast => {
                let message = action.message.as_deref().unwrap_or("Action completed");
                let variant = action.variant.unwrap_or_default();
                self.services.notifier.toast(variant, message);
            }
            ActionType::Navigate => match &action.path {
                Some(path) => self.services.navigator.navigate(path),
                None => debug!("navigate `{}` has no path, skipped", action.id),
            },
            ActionType::OpenDialog | ActionType::CloseDialog => {
                let flag = match (&action.path, &action.target) {
                    (Some(path), _) => path.clone(),
                    (None, Some(target)) => format!("uiState.dialogs.{target}"),
                    (None, None) => {
                        debug!("dialog action `{}` names no dialog, skipped", action.id);
                        return Ok(());
                    }
                };
                let open = action.kind == ActionType::OpenDialog;
                self.write(&flag, Value::Bool(open)).await?;
            }
            ActionType::Custom => match &self.services.custom {
                Some(handler) => {
                    handler
                        .execute(action, event, &mut *self.store)
                        .await
                        .map_err(|source| ActionError::Custom {
                            id: action.id.clone(),
                            source,
                        })?;
                }
                None => debug!("no custom handler for `{}`", action.id),
            },
        }
        Ok(())
    }

    fn target<'b>(&self, action: &'b Action) -> Option<&'b str> {
        let target = action.target.as_deref().filter(|t| !t.is_empty());
        if target.is_none() {
            debug!("{:?} `{}` has no target, skipped", action.kind, action.id);
        }
        target
    }

    /// The data context with repeat locals laid over it.
    fn scope(&self) -> Cow<'_, Map<String, Value>> {
        if self.locals.is_empty() {
            return Cow::Borrowed(self.store.data());
        }
        let mut scope = self.store.data().clone();
        scope.extend(self.locals.clone());
        Cow::Owned(scope)
    }

    fn current(&self, target: &str) -> Option<Value> {
        get_in_map(self.store.data(), target)
    }

    /// `compute` > `expression` > `valueTemplate` > `value`.
    fn resolve_value(&self, action: &Action, event: Option<&Value>) -> Result<Option<Value>, ActionError> {
        let scope = self.scope();
        let ctx = EvalContext::new(&scope).with_event(event);

        if let Some(name) = &action.compute {
            let f = self
                .store
                .computes()
                .get(name)
                .ok_or_else(|| ActionError::UnknownCompute(name.clone()))?;
            return Ok(Some(f(&*scope, event)));
        }
        if let Some(expr) = &action.expression {
            return Ok(evaluate_expression(expr, &ctx));
        }
        if let Some(template) = &action.value_template {
            return Ok(Some(Value::Object(evaluate_template(template, &ctx))));
        }
        Ok(action.value.clone())
    }

    /// Write `value` to a source id or to a dotted path rooted at one.
    async fn write(&mut self, target: &str, value: Value) -> Result<(), StoreError> {
        match target.split_once('.') {
            Some((source, path)) => self.store.update_path(source, path, value).await,
            None => self.store.update_data(target, value).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use std::path::PathBuf;

    use super::*;
    use crate::{
        kv::{KvError, KvStore, MemoryKvStore},
        schema::DataSource,
        store::ComputeRegistry,
    };
    use serde_json::json;

    /// Backend that loses every read and rejects every write.
    struct FailingKv;

    fn unavailable() -> KvError {
        KvError::Io {
            path: PathBuf::from("kv.json"),
            source: std::io::Error::other("backend unavailable"),
        }
    }

    #[async_trait]
    impl KvStore for FailingKv {
        async fn get(&self, _key: &str) -> Result<Option<Value>, KvError> {
            Err(unavailable())
        }
        async fn set(&self, _key: &str, _value: Value) -> Result<(), KvError> {
            Err(unavailable())
        }
        async fn delete(&self, _key: &str) -> Result<(), KvError> {
            Err(unavailable())
        }
        async fn keys(&self) -> Result<Vec<String>, KvError> {
            Err(unavailable())
        }
        async fn clear(&self) -> Result<(), KvError> {
            Err(unavailable())
        }
    }

    #[derive(Default)]
    struct Recorder {
        toasts: Mutex<Vec<(ToastVariant, String)>>,
        paths: Mutex<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn toast(&self, variant: ToastVariant, message: &str) {
            self.toasts.lock().unwrap().push((variant, message.to_string()));
        }
    }

    impl Navigator for Recorder {
        fn navigate(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_string());
        }
    }

    struct Failing;

    #[async_trait]
    impl CustomActionHandler for Failing {
        async fn execute(&self, action: &Action, _event: Option<&Value>, store: &mut DataStore) -> anyhow::Result<()> {
            if action.id == "ok" {
                store.update_data("custom", json!(true)).await?;
                return Ok(());
            }
            anyhow::bail!("boom")
        }
    }

    fn services() -> (Arc<Recorder>, UiServices) {
        let rec = Arc::new(Recorder::default());
        let services = UiServices::new(rec.clone(), rec.clone()).with_custom(Arc::new(Failing));
        (rec, services)
    }

    async fn store(sources: Vec<DataSource>) -> DataStore {
        DataStore::load(sources, Arc::new(MemoryKvStore::default()), ComputeRegistry::builtin()).await
    }

    #[tokio::test]
    async fn test_increment_accumulates() {
        let mut store = store(vec![DataSource::constant("counter", json!(10))]).await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);
        let inc = Action::new("inc", ActionType::Increment)
            .with_target("counter")
            .with_value(json!(5));
        exec.execute_action(&inc, None).await;
        assert_eq!(exec.store().get("counter"), Some(&json!(15)));
        exec.execute_action(&inc, None).await;
        exec.execute_action(&inc, None).await;
        assert_eq!(exec.store().get("counter"), Some(&json!(25)));

        let dec = Action::new("dec", ActionType::Decrement).with_target("missing");
        exec.execute_action(&dec, None).await;
        assert_eq!(exec.store().get("missing"), Some(&json!(-1)));
    }

    #[tokio::test]
    async fn test_create_from_template() {
        let mut store = store(vec![
            DataSource::kv("todos", "todos", json!([])),
            DataSource::constant("newTodo", json!("buy milk")),
        ])
        .await;
        let (rec, services) = services();
        let template = json!({"id": "Date.now()", "text": "data.newTodo", "completed": false});
        let create = Action::new("add", ActionType::Create)
            .with_target("todos")
            .with_template(template.as_object().unwrap().clone());
        let mut exec = ActionExecutor::new(&mut store, &services);
        exec.execute_action(&create, None).await;

        let todos = exec.store().get("todos").unwrap().as_array().unwrap().clone();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0]["completed"], json!(false));
        assert_eq!(todos[0]["text"], json!("buy milk"));
        assert!(todos[0]["id"].is_number());
        assert!(rec.toasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_value_priority() {
        let mut store = store(vec![DataSource::constant("newTodo", json!("  x "))]).await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);
        let action = Action::new("set", ActionType::SetValue)
            .with_target("out")
            .with_value(json!("literal"))
            .with_expression("data.newTodo")
            .with_compute("checkCanAddTodo");
        exec.execute_action(&action, None).await;
        assert_eq!(exec.store().get("out"), Some(&json!(true)));

        let action = Action::new("set", ActionType::Update)
            .with_target("out")
            .with_value(json!("literal"))
            .with_expression("event.target.value");
        let ev = json!({"target": {"value": "typed"}});
        exec.execute_action(&action, Some(&ev)).await;
        assert_eq!(exec.store().get("out"), Some(&json!("typed")));
    }

    #[tokio::test]
    async fn test_delete_by_path_and_value() {
        let mut store = store(vec![
            DataSource::constant("todos", json!([{"id": 1}, {"id": 2}, {"id": 3}])),
            DataSource::constant("tags", json!(["a", "b", "a"])),
        ])
        .await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);

        let del = Action::new("del", ActionType::Delete)
            .with_target("todos")
            .with_path("id")
            .with_value(json!(2.0));
        exec.execute_action(&del, None).await;
        assert_eq!(exec.store().get("todos"), Some(&json!([{"id": 1}, {"id": 3}])));

        let del = Action::new("del", ActionType::Delete).with_target("tags").with_value(json!("a"));
        exec.execute_action(&del, None).await;
        assert_eq!(exec.store().get("tags"), Some(&json!(["b"])));

        // A falsy value deletes nothing.
        let del = Action::new("del", ActionType::Delete).with_target("tags").with_value(json!(0));
        exec.execute_action(&del, None).await;
        assert_eq!(exec.store().get("tags"), Some(&json!(["b"])));
    }

    #[tokio::test]
    async fn test_dialogs_toggle_and_nested_targets() {
        let mut store = store(vec![
            DataSource::constant("uiState", json!({"theme": "dark"})),
            DataSource::constant("flag", json!(false)),
        ])
        .await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);

        exec.execute_action(&Action::new("o", ActionType::OpenDialog).with_target("settings"), None)
            .await;
        assert_eq!(exec.store().get("uiState").unwrap()["dialogs"]["settings"], json!(true));
        exec.execute_action(&Action::new("c", ActionType::CloseDialog).with_target("settings"), None)
            .await;
        assert_eq!(exec.store().get("uiState").unwrap()["dialogs"]["settings"], json!(false));
        assert_eq!(exec.store().get("uiState").unwrap()["theme"], json!("dark"));

        exec.execute_action(&Action::new("t", ActionType::ToggleValue).with_target("flag"), None)
            .await;
        assert_eq!(exec.store().get("flag"), Some(&json!(true)));

        let nested = Action::new("n", ActionType::SetValue)
            .with_target("uiState.theme")
            .with_value(json!("light"));
        exec.execute_action(&nested, None).await;
        assert_eq!(exec.store().get("uiState").unwrap()["theme"], json!("light"));
    }

    #[tokio::test]
    async fn test_toast_navigate_and_custom() {
        let mut store = store(Vec::new()).await;
        let (rec, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);

        exec.execute_actions(
            &[
                Action::new("t", ActionType::ShowToast),
                Action::new("t2", ActionType::ShowToast).with_message("Saved", ToastVariant::Info),
                Action::new("n", ActionType::Navigate).with_path("/settings"),
                Action::new("ok", ActionType::Custom),
                Action::new("fails", ActionType::Custom),
            ],
            None,
        )
        .await;

        assert_eq!(exec.store().get("custom"), Some(&json!(true)));
        assert_eq!(rec.paths.lock().unwrap().as_slice(), ["/settings"]);
        assert_eq!(
            rec.toasts.lock().unwrap().as_slice(),
            [
                (ToastVariant::Success, "Action completed".to_string()),
                (ToastVariant::Info, "Saved".to_string()),
                (ToastVariant::Error, "Action failed".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_compute_reports_failure() {
        let mut store = store(Vec::new()).await;
        let (rec, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);
        let action = Action::new("x", ActionType::Update).with_target("a").with_compute("nope");
        let err = exec.try_execute_action(&action, None).await.unwrap_err();
        assert!(matches!(err, ActionError::UnknownCompute(ref n) if n == "nope"));
        exec.execute_action(&action, None).await;
        assert_eq!(rec.toasts.lock().unwrap().len(), 1);
        assert!(exec.store().get("a").is_none());
    }

    #[tokio::test]
    async fn test_handler_locals_and_condition() {
        let mut store = store(vec![DataSource::constant("todos", json!([{"id": 1}, {"id": 2}]))]).await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);

        let mut locals = Map::new();
        locals.insert("todo".into(), json!({"id": 2}));
        let handler = BoundHandler {
            event: "click".into(),
            prop: "onClick".into(),
            actions: vec![Action::new("del", ActionType::Delete)
                .with_target("todos")
                .with_path("id")
                .with_expression("data.todo.id")],
            condition: Some("data.todos.length > 0".into()),
            locals,
        };
        assert!(exec.execute_handler(&handler, None).await);
        assert_eq!(exec.store().get("todos"), Some(&json!([{"id": 1}])));

        let blocked = BoundHandler {
            condition: Some("data.todos.length > 5".into()),
            ..handler
        };
        assert!(!exec.execute_handler(&blocked, None).await);
        assert_eq!(exec.store().get("todos"), Some(&json!([{"id": 1}])));
    }

    #[tokio::test]
    async fn test_kv_write_failure_keeps_value_and_toasts() {
        let mut store = DataStore::load(
            vec![DataSource::kv("counter", "counter", json!(1))],
            Arc::new(FailingKv),
            ComputeRegistry::new(),
        )
        .await;
        let (rec, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);
        let inc = Action::new("inc", ActionType::Increment).with_target("counter");

        let err = exec.try_execute_action(&inc, None).await.unwrap_err();
        assert!(matches!(err, ActionError::Store(StoreError::Persist { .. })));
        assert_eq!(exec.store().get("counter"), Some(&json!(2)));

        exec.execute_action(&inc, None).await;
        assert_eq!(exec.store().get("counter"), Some(&json!(3)));
        assert_eq!(
            rec.toasts.lock().unwrap().as_slice(),
            [(ToastVariant::Error, "Action failed".to_string())]
        );
    }

    #[tokio::test]
    async fn test_handler_condition_names_compute_function() {
        let mut store = store(vec![
            DataSource::constant("todos", json!([])),
            DataSource::constant("newTodo", json!("   ")),
        ])
        .await;
        let (_, services) = services();
        let mut exec = ActionExecutor::new(&mut store, &services);

        let add = BoundHandler {
            event: "click".into(),
            prop: "onClick".into(),
            actions: vec![Action::new("create", ActionType::Create)
                .with_target("todos")
                .with_expression("data.newTodo")],
            condition: Some("checkCanAddTodo".into()),
            locals: Map::new(),
        };
        assert!(!exec.execute_handler(&add, None).await);
        assert_eq!(exec.store().get("todos"), Some(&json!([])));

        exec.execute_action(
            &Action::new("type", ActionType::SetValue)
                .with_target("newTodo")
                .with_value(json!("milk")),
            None,
        )
        .await;
        assert!(exec.execute_handler(&add, None).await);
        assert_eq!(exec.store().get("todos"), Some(&json!(["milk"])));

        let unknown = BoundHandler {
            condition: Some("noSuchCheck".into()),
            ..add
        };
        assert!(!exec.execute_handler(&unknown, None).await);
        assert_eq!(exec.store().get("todos"), Some(&json!(["milk"])));
    }
}
