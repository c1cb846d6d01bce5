//! Schema types for JSON UI pages.
//!
//! The module is organized into several submodules:
//!
//! - [`action`] - Declarative actions bound to events
//! - [`component`] - Component tree nodes, bindings, events and repeats
//! - [`data_source`] - Named data source declarations
//! - [`page`] - Page schema, layout and component tree documents
//! - [`error`] - Import and validation errors

/// Declarative actions.
pub mod action;

/// Component tree nodes.
pub mod component;

/// Data source declarations.
pub mod data_source;

/// Schema import and validation errors.
pub mod error;

/// Page-level documents.
pub mod page;

pub use action::{Action, ActionType, ToastVariant};
pub use component::{
    Binding, ComponentCondition, Conditional, DataBindingRef, EventHandler, Loop, PropBinding, Repeat,
    UIComponent,
};
pub use data_source::{DataSource, DataSourceType};
pub use error::SchemaError;
pub use page::{ComponentNode, ComponentTree, Layout, LayoutArea, LayoutType, PageSchema};

use serde_json::Value;

/// Check that `value` is an object carrying string `id` and `name` fields
/// and an array under `list_field`.
pub(crate) fn check_document_shape(value: &Value, list_field: &str) -> Result<(), SchemaError> {
    let Value::Object(obj) = value else {
        return Err(SchemaError::NotAnObject);
    };

    for field in ["id", "name"] {
        match obj.get(field) {
            Some(Value::String(_)) => {}
            Some(other) => {
                return Err(SchemaError::TypeMismatch {
                    path: field.to_string(),
                    expected: "string".to_string(),
                    actual: other.to_string(),
                });
            }
            None => return Err(SchemaError::MissingField(field.to_string())),
        }
    }

    match obj.get(list_field) {
        Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(SchemaError::TypeMismatch {
            path: list_field.to_string(),
            expected: "array".to_string(),
            actual: other.to_string(),
        }),
        None => Err(SchemaError::MissingField(list_field.to_string())),
    }
}
