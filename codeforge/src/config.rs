//! Workspace configuration types.
//!
//! Configuration is stored in `.codeforge.toml` at the workspace root. Every
//! section is optional; a missing file yields the defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [kv]
//! path = "${workspaceFolder}/.codeforge/kv.json"
//!
//! [render]
//! extra_components = ["Chart"]
//! ```
//!
//! String values may contain `${workspaceFolder}` and `${env:VAR}`
//! placeholders.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ForgeConfig {
    /// Storage for `kv` data sources.
    pub kv: KvConfig,
    /// Renderer options.
    pub render: RenderConfig,
}

/// Storage for `kv` data sources.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct KvConfig {
    /// JSON file backing the store. An in-memory store is used when unset.
    pub path: Option<String>,
}

/// Renderer options.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Component types accepted in addition to the built-in set.
    pub extra_components: Vec<String>,
}

impl ForgeConfig {
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
