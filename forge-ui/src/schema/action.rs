use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a declarative action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// Append a new element to the array at `target`.
    Create,
    /// Replace `target` wholesale.
    Update,
    /// Remove matching elements from the array at `target`.
    Delete,
    /// Set the location hash to `path`.
    Navigate,
    /// Fire a user notification.
    ShowToast,
    /// Set a dialog flag to `true`.
    OpenDialog,
    /// Set a dialog flag to `false`.
    CloseDialog,
    /// Replace `target` wholesale.
    SetValue,
    /// Negate the boolean at `target`.
    ToggleValue,
    /// Add `value` (default 1) to `target`.
    Increment,
    /// Subtract `value` (default 1) from `target`.
    Decrement,
    /// Delegate to the host's custom action handler.
    Custom,
}

/// Toast notification style.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Success,
    Error,
    Info,
    Warning,
}

impl std::fmt::Display for ToastVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToastVariant::Success => "success",
            ToastVariant::Error => "error",
            ToastVariant::Info => "info",
            ToastVariant::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// One declarative mutation or side effect.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionType,
    /// Data source id, or a dotted path rooted at one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Field path for `delete`, hash for `navigate`, flag path for dialogs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Object whose string fields are evaluated as expressions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_template: Option<Map<String, Value>>,
    /// Name of a registered compute function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<ToastVariant>,
    /// Extra parameters passed through to custom handlers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Action {
    /// An action of `kind` with every optional field unset.
    pub fn new(id: impl Into<String>, kind: ActionType) -> Self {
        Self {
            id: id.into(),
            kind,
            target: None,
            path: None,
            value: None,
            expression: None,
            value_template: None,
            compute: None,
            message: None,
            variant: None,
            params: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn with_template(mut self, template: Map<String, Value>) -> Self {
        self.value_template = Some(template);
        self
    }

    pub fn with_compute(mut self, name: impl Into<String>) -> Self {
        self.compute = Some(name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>, variant: ToastVariant) -> Self {
        self.message = Some(message.into());
        self.variant = Some(variant);
        self
    }
}
