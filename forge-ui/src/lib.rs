//! # forge-ui
//!
//! The JSON-driven UI engine behind CodeForge.
//!
//! A page is described by a [`PageSchema`]: a list of data sources, a layout and
//! a tree of [`UIComponent`]s. This crate loads the data sources into a
//! [`DataStore`], renders the component tree against the current data,
//! and dispatches the declarative [`Action`]s bound to component events back
//! into the store.
//!
//! ## Features
//!
//! - Closed-form expression evaluator (`data.x`, `event.y`, `Fn(args)`, literals)
//! - `{{ expression }}` and `{type: "binding"}` prop bindings with fallbacks
//! - `kv`, `static` and `computed` data sources over an injected KV backend
//! - Action dispatch: create / update / delete / toggle / increment / dialogs / toasts
//! - Condition, conditional, repeat and loop handling in the renderer, fail-soft on unknown types
//! - Named compute functions for event conditions and binding transforms
//! - Component tree import/export with structural validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use forge_ui::{
//!     ComponentRegistry, ComputeRegistry, DataStore, PageSchema, Renderer,
//!     kv::MemoryKvStore,
//! };
//!
//! # async fn demo(json: &str) -> anyhow::Result<()> {
//! let page = PageSchema::from_json(json)?;
//! let store = DataStore::load(
//!     page.data_sources.clone(),
//!     Arc::new(MemoryKvStore::default()),
//!     ComputeRegistry::builtin(),
//! )
//! .await;
//!
//! let registry = ComponentRegistry::builtin();
//! let rendered = Renderer::new(&registry).render_page(&page, store.data());
//! println!("{} root nodes", rendered.nodes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`schema`] - Page, component, action and data source types
//! - [`expr`] - Expression, condition and template evaluation
//! - [`binding`] - Prop binding resolution
//! - [`store`] - Data source registry and data context
//! - [`kv`] - Key-value storage backends
//! - [`action`] - Action dispatcher
//! - [`render`] - Component tree renderer
//! - [`library`] - Component tree import/export

#[macro_use]
extern crate log;

/// Page, component, action and data source types.
///
/// These shapes are the JSON wire format used for schema import and export.
pub mod schema;

/// Closed-form expression evaluation.
pub mod expr;

/// Prop binding resolution against a data context.
pub mod binding;

/// Data source registry and the mutable data context.
pub mod store;

/// Key-value storage backends for `kv` data sources.
pub mod kv;

/// Declarative action dispatch.
pub mod action;

/// Component tree renderer.
pub mod render;

/// Component tree library with JSON import/export.
pub mod library;

pub use action::{ActionExecutor, CustomActionHandler, Navigator, Notifier, UiServices};
pub use binding::BindingResolver;
pub use expr::{EvalContext, evaluate_condition, evaluate_expression};
pub use library::TreeLibrary;
pub use render::{ComponentRegistry, RenderNode, Renderer};
pub use schema::{Action, ActionType, Binding, DataSource, PageSchema, UIComponent};
pub use serde_json::{Map, Value};
pub use store::{ComputeRegistry, DataStore};
