use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a data source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceType {
    /// Persisted through the external key-value store.
    Kv,
    /// Derived from other sources.
    Computed,
    /// Constant initialised from `defaultValue`.
    Static,
}

/// A named slot of application state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Identity, unique within a schema.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DataSourceType,
    /// Storage key for `kv` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Closed-form expression for `computed` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Name of a registered compute function for `computed` sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<String>,
    /// Sources this one reads from. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl DataSource {
    /// A `static` source holding `value`.
    pub fn constant(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            kind: DataSourceType::Static,
            key: None,
            default_value: Some(value),
            expression: None,
            compute: None,
            dependencies: Vec::new(),
        }
    }

    /// A `kv` source persisted under `key`.
    pub fn kv(id: impl Into<String>, key: impl Into<String>, default: Value) -> Self {
        Self {
            id: id.into(),
            kind: DataSourceType::Kv,
            key: Some(key.into()),
            default_value: Some(default),
            expression: None,
            compute: None,
            dependencies: Vec::new(),
        }
    }

    /// A `computed` source evaluated from `expression`.
    pub fn computed(
        id: impl Into<String>,
        expression: impl Into<String>,
        dependencies: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            kind: DataSourceType::Computed,
            key: None,
            default_value: None,
            expression: Some(expression.into()),
            compute: None,
            dependencies: dependencies.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The key used when writing this source to the KV store.
    pub fn storage_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }
}
