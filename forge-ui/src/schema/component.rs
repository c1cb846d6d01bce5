use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::action::{Action, ActionType};

/// A declarative pointer from a prop to a data source.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Binding {
    /// Data source id.
    pub source: String,
    /// Dotted path inside the source value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// String operation name or expression applied to the resolved value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl Binding {
    /// A binding to the whole value of `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: None,
            transform: None,
        }
    }

    /// Narrow the binding to a dotted `path` inside the source value.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Inline prop binding: `{"type": "binding", "expression": ..., "fallback": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropBinding {
    pub expression: String,
    pub fallback: Option<Value>,
}

impl PropBinding {
    /// Recognise the tagged binding object form of a prop value.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("type").and_then(Value::as_str) != Some("binding") {
            return None;
        }
        let expression = obj.get("expression")?.as_str()?.to_string();
        Some(Self {
            expression,
            fallback: obj.get("fallback").cloned(),
        })
    }
}

/// Visibility condition of a component.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum ComponentCondition {
    /// Condition string such as `data.todos.length > 0`.
    Expression(String),
    /// Truthiness of a bound value.
    Binding(Binding),
}

/// Render a node once per element of an array expression.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    /// Expression that should evaluate to an array.
    pub items: String,
    /// Name under which each element is visible in the data context.
    pub item_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
}

/// Where a `dataBinding` or `loop` reads its value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum DataBindingRef {
    /// Dotted path into the data context, e.g. `user.name`.
    Path(String),
    Binding(Binding),
}

/// Render the children once per element of a bound array, without a node
/// for the component itself.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    pub source: DataBindingRef,
    pub item_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
}

/// Render `then` or `else` in place of a component depending on a condition.
///
/// When the condition holds and there is no `then`, the component renders
/// as usual.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Conditional {
    pub r#if: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Box<UIComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#else: Option<Box<UIComponent>>,
}

/// Actions fired by one component event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EventHandler {
    /// Event name without the `on` prefix, e.g. `click`.
    pub event: String,
    pub actions: Vec<Action>,
    /// Condition string checked before the actions run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// A node of the UI component tree.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UIComponent {
    pub id: String,
    /// Component type looked up in the registry.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Binding>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_events"
    )]
    #[schemars(with = "Vec<EventHandler>")]
    pub events: Vec<EventHandler>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UIComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ComponentCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#loop: Option<Loop>,
    /// Bound value exposed to the component as both `value` and `data` props.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_binding: Option<DataBindingRef>,
    /// Keys the renderer does not understand, kept so export does not lose them.
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: Map<String, Value>,
}

impl UIComponent {
    /// A component with no props, events or children.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: Map::new(),
            bindings: BTreeMap::new(),
            events: Vec::new(),
            children: Vec::new(),
            condition: None,
            repeat: None,
            class_name: None,
            style: None,
            conditional: None,
            r#loop: None,
            data_binding: None,
            extra: Map::new(),
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: Value) -> Self {
        self.props.insert(name.into(), value);
        self
    }

    pub fn with_child(mut self, child: UIComponent) -> Self {
        self.children.push(child);
        self
    }

    /// Bind `actions` to `event` with no condition.
    pub fn with_event(mut self, event: impl Into<String>, actions: Vec<Action>) -> Self {
        self.events.push(EventHandler {
            event: event.into(),
            actions,
            condition: None,
        });
        self
    }

    /// Depth-first search for the component with `id`.
    pub fn find(&self, id: &str) -> Option<&UIComponent> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Children plus the `then` and `else` branches of a conditional.
    pub fn subtrees(&self) -> impl Iterator<Item = &UIComponent> {
        let branches = self
            .conditional
            .iter()
            .flat_map(|c| c.then.iter().chain(c.r#else.iter()))
            .map(|b| &**b);
        self.children.iter().chain(branches)
    }

    /// Log every component in this subtree carrying keys the renderer ignores.
    pub fn warn_unknown_keys(&self) {
        if !self.extra.is_empty() {
            let keys: Vec<_> = self.extra.keys().collect();
            warn!("component `{}` has unsupported keys {keys:?}", self.id);
        }
        for c in self.subtrees() {
            c.warn_unknown_keys();
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventsRepr {
    List(Vec<EventHandler>),
    Map(BTreeMap<String, LegacyHandler>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyHandler {
    Name(String),
    Actions {
        actions: Vec<Action>,
        #[serde(default)]
        condition: Option<String>,
    },
    Single {
        action: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        params: Option<Value>,
    },
    Other(Value),
}

/// `onClick` -> `click`; other names are kept.
fn normalize_event_name(name: &str) -> String {
    match name.strip_prefix("on") {
        Some(rest) if !rest.is_empty() => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => rest.to_string(),
            }
        }
        _ => name.to_string(),
    }
}

fn deserialize_events<'de, D>(deserializer: D) -> Result<Vec<EventHandler>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<EventsRepr>::deserialize(deserializer)?;
    let handlers = match repr {
        None => Vec::new(),
        Some(EventsRepr::List(list)) => list,
        Some(EventsRepr::Map(map)) => map
            .into_iter()
            .filter_map(|(name, handler)| {
                let event = normalize_event_name(&name);
                match handler {
                    LegacyHandler::Name(id) => Some(EventHandler {
                        event,
                        actions: vec![Action::new(id, ActionType::Custom)],
                        condition: None,
                    }),
                    LegacyHandler::Actions { actions, condition } => Some(EventHandler {
                        event,
                        actions,
                        condition,
                    }),
                    LegacyHandler::Single {
                        action,
                        target,
                        params,
                    } => {
                        let mut a = Action::new(action, ActionType::Custom);
                        a.target = target;
                        a.params = params;
                        Some(EventHandler {
                            event,
                            actions: vec![a],
                            condition: None,
                        })
                    }
                    LegacyHandler::Other(v) => {
                        debug!("ignoring event handler `{name}`: {v}");
                        None
                    }
                }
            })
            .collect(),
    };
    Ok(handlers)
}
