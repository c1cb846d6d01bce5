use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Action, DataSource, SchemaError, UIComponent, check_document_shape};

/// Page arrangement.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
    #[default]
    Single,
    Split,
    Tabs,
    Grid,
}

/// A named region of a layout holding one component.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct LayoutArea {
    pub id: String,
    pub component: UIComponent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Layout {
    #[serde(rename = "type")]
    pub kind: LayoutType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<LayoutArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<u32>,
}

/// Top-level page document: data sources plus a component tree.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
    pub components: Vec<UIComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_actions: Vec<Action>,
}

impl PageSchema {
    /// Parse a page document after checking its top-level shape.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Json`] for malformed JSON, otherwise see
    /// [`from_value`](Self::from_value).
    pub fn from_json(s: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    /// Decode a page document. Component keys the renderer ignores are
    /// logged as warnings.
    ///
    /// # Errors
    ///
    /// Returns an error when `id`, `name` or `components` is missing or of
    /// the wrong type, or when the document does not decode.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        check_document_shape(&value, "components")?;
        let page: Self = serde_json::from_value(value)?;
        page.components
            .iter()
            .chain(page.layout.areas.iter().map(|a| &a.component))
            .for_each(UIComponent::warn_unknown_keys);
        Ok(page)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Find a component anywhere in the page, layout areas included.
    pub fn find_component(&self, id: &str) -> Option<&UIComponent> {
        self.components
            .iter()
            .chain(self.layout.areas.iter().map(|a| &a.component))
            .find_map(|c| c.find(id))
    }
}

/// A node of an editor component tree.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ComponentNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ComponentNode::count).sum::<usize>()
    }
}

/// A saved component tree, the unit of JSON import in the editor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTree {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub root_nodes: Vec<ComponentNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl ComponentTree {
    /// Parse a tree document after checking its top-level shape.
    pub fn from_json(s: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(s)?;
        check_document_shape(&value, "rootNodes")?;
        Ok(serde_json::from_value(value)?)
    }
}
