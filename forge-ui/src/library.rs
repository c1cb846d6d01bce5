//! Saved component trees with JSON import and export.

use thiserror::Error;

use crate::{
    action::Notifier,
    schema::{ComponentTree, SchemaError, ToastVariant},
};

/// Failure of a library operation.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("invalid component tree: {0}")]
    Invalid(#[from] SchemaError),
    #[error("no component tree with id `{0}`")]
    NotFound(String),
}

/// Ordered list of component trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeLibrary {
    trees: Vec<ComponentTree>,
}

impl TreeLibrary {
    pub fn new(trees: Vec<ComponentTree>) -> Self {
        Self { trees }
    }

    pub fn trees(&self) -> &[ComponentTree] {
        &self.trees
    }

    pub fn get(&self, id: &str) -> Option<&ComponentTree> {
        self.trees.iter().find(|t| t.id == id)
    }

    /// Validate and add a tree document.
    ///
    /// A tree whose id is already present replaces it in place; otherwise
    /// the tree is appended. On error the library is left untouched.
    pub fn import_json(&mut self, json: &str) -> Result<&ComponentTree, LibraryError> {
        let tree = ComponentTree::from_json(json)?;
        let idx = match self.trees.iter().position(|t| t.id == tree.id) {
            Some(idx) => {
                debug!("replacing component tree `{}`", tree.id);
                self.trees[idx] = tree;
                idx
            }
            None => {
                self.trees.push(tree);
                self.trees.len() - 1
            }
        };
        Ok(&self.trees[idx])
    }

    /// [`import_json`](Self::import_json), reporting the outcome as a toast.
    pub fn import_or_notify(&mut self, json: &str, notifier: &dyn Notifier) -> bool {
        match self.import_json(json) {
            Ok(tree) => {
                let message = format!("Imported component tree \"{}\"", tree.name);
                notifier.toast(ToastVariant::Success, &message);
                true
            }
            Err(e) => {
                warn!("component tree import rejected: {e}");
                notifier.toast(ToastVariant::Error, "Invalid component tree JSON");
                false
            }
        }
    }

    pub fn export_json(&self, id: &str) -> Result<String, LibraryError> {
        let tree = self
            .get(id)
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        Ok(serde_json::to_string_pretty(tree).map_err(SchemaError::from)?)
    }

    pub fn remove(&mut self, id: &str) -> Option<ComponentTree> {
        let idx = self.trees.iter().position(|t| t.id == id)?;
        Some(self.trees.remove(idx))
    }
}
