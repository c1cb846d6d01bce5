//! Application context and state management.
//!
//! This module provides the [`AppContext`] type which holds the state shared
//! by every command: workspace paths, the loaded configuration and the host
//! services handed to the action dispatcher.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use forge_ui::{
    ComponentRegistry, ComputeRegistry, DataStore, PageSchema, UiServices,
    kv::{JsonFileKvStore, KvStore, MemoryKvStore},
    render::ComponentSpec,
};
use tokio::fs;

use crate::{
    config::ForgeConfig,
    notify::{ConsoleNotifier, HashNavigator, LoggingCustomHandler},
    utils::replace_placeholders,
};

/// Name of the configuration file looked up in the workspace.
pub const CONFIG_FILE: &str = ".codeforge.toml";

/// Path configuration grouping all path-related fields.
#[derive(Default, Debug, Clone)]
pub struct PathConfig {
    /// Workspace root directory.
    pub workspace: PathBuf,
    /// Configuration file, `.codeforge.toml` in the workspace by default.
    pub config: PathBuf,
}

/// The main application context holding all state.
#[derive(Default, Debug, Clone)]
pub struct AppContext {
    pub paths: PathConfig,
    pub config: ForgeConfig,
    /// Records the hash requested by `navigate` actions.
    pub navigator: Arc<HashNavigator>,
}

impl AppContext {
    /// A context rooted at `workspace`, or the current directory.
    pub fn new(workspace: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<Self> {
        let workspace = match workspace {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        let config = config.unwrap_or_else(|| workspace.join(CONFIG_FILE));
        Ok(Self {
            paths: PathConfig { workspace, config },
            ..Default::default()
        })
    }

    /// Loads the configuration file, keeping the defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn prepare_config(&mut self) -> anyhow::Result<&ForgeConfig> {
        let path = &self.paths.config;
        match fs::read_to_string(path).await {
            Ok(content) => {
                self.config = ForgeConfig::from_toml(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                debug!("loaded config from {}", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        }
        Ok(&self.config)
    }

    /// Replaces variable placeholders in a string.
    pub fn value_replace_with_var(&self, value: &str) -> String {
        replace_placeholders(value, &self.paths.workspace)
    }

    /// The KV file, with placeholders expanded and relative paths resolved
    /// against the workspace.
    pub fn kv_path(&self) -> Option<PathBuf> {
        let raw = self.config.kv.path.as_deref()?;
        let path = PathBuf::from(self.value_replace_with_var(raw));
        Some(if path.is_relative() {
            self.paths.workspace.join(path)
        } else {
            path
        })
    }

    pub fn open_kv(&self) -> Arc<dyn KvStore> {
        match self.kv_path() {
            Some(path) => {
                debug!("kv store at {}", path.display());
                Arc::new(JsonFileKvStore::new(path))
            }
            None => Arc::new(MemoryKvStore::default()),
        }
    }

    /// The built-in registry plus the configured extra component types.
    pub fn registry(&self) -> ComponentRegistry {
        let mut registry = ComponentRegistry::builtin();
        for name in &self.config.render.extra_components {
            registry.register(name.clone(), ComponentSpec::element(name.to_lowercase()));
        }
        registry
    }

    pub fn services(&self) -> UiServices {
        UiServices::new(Arc::new(ConsoleNotifier), self.navigator.clone())
            .with_custom(Arc::new(LoggingCustomHandler))
    }

    /// Reads and validates a page schema file.
    pub async fn load_page(&self, path: impl AsRef<Path>) -> anyhow::Result<PageSchema> {
        let path = self.resolve(path.as_ref());
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        PageSchema::from_json(&content).with_context(|| format!("Invalid page schema {}", path.display()))
    }

    /// Initialises the data sources of `page` against the configured KV store.
    pub async fn open_store(&self, page: &PageSchema) -> DataStore {
        DataStore::load(page.data_sources.clone(), self.open_kv(), ComputeRegistry::builtin()).await
    }

    /// `path` relative to the workspace unless absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.paths.workspace.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_prepare_config_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = AppContext::new(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(ctx.prepare_config().await.unwrap(), &ForgeConfig::default());
        assert!(ctx.kv_path().is_none());
    }

    #[tokio::test]
    async fn test_prepare_config_and_kv_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[kv]\npath = \"${workspaceFolder}/state/kv.json\"\n[render]\nextra_components = [\"Chart\"]\n",
        )
        .unwrap();
        let mut ctx = AppContext::new(Some(dir.path().to_path_buf()), None).unwrap();
        ctx.prepare_config().await.unwrap();
        assert_eq!(ctx.kv_path().unwrap(), dir.path().join("state/kv.json"));
        assert!(ctx.registry().contains("Chart"));

        let kv = ctx.open_kv();
        kv.set("k", json!(1)).await.unwrap();
        assert!(dir.path().join("state/kv.json").exists());
    }

    #[tokio::test]
    async fn test_prepare_config_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "kv = 1").unwrap();
        let mut ctx = AppContext::new(Some(dir.path().to_path_buf()), Some(config)).unwrap();
        assert!(ctx.prepare_config().await.is_err());
    }

    #[tokio::test]
    async fn test_load_page_and_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("page.json"),
            r#"{"id": "p", "name": "P",
                "dataSources": [{"id": "count", "type": "static", "defaultValue": 3}],
                "components": []}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.json"), r#"{"id": "p", "components": []}"#).unwrap();

        let ctx = AppContext::new(Some(dir.path().to_path_buf()), None).unwrap();
        let page = ctx.load_page("page.json").await.unwrap();
        let store = ctx.open_store(&page).await;
        assert_eq!(store.get("count"), Some(&json!(3)));
        assert!(ctx.load_page("bad.json").await.is_err());
        assert!(ctx.load_page("missing.json").await.is_err());
    }
}
