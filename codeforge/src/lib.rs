//! # codeforge
//!
//! Command line runner for CodeForge JSON page schemas.
//!
//! `codeforge` loads a page schema, backs its `kv` data sources with a JSON
//! file, renders the component tree to the terminal and dispatches the
//! actions bound to component events, printing the resulting data.
//!
//! ## Modules
//!
//! - [`config`] - `.codeforge.toml` configuration types
//! - [`ctx`] - Application context and state management
//! - [`notify`] - Console notifier, navigator and custom action handler
//! - [`tree`] - Terminal rendering of component trees
//! - [`utils`] - Placeholder substitution and argument helpers
//!
//! ## Example
//!
//! ```rust,no_run
//! // codeforge is primarily used as a CLI tool
//! // See the binary target for usage examples
//! ```

/// Workspace configuration loaded from `.codeforge.toml`.
pub mod config;

/// Application context and state management.
pub mod ctx;

/// Host services handed to the action dispatcher.
pub mod notify;

/// Terminal rendering of rendered component trees.
pub mod tree;

/// Common utilities and helper functions.
pub mod utils;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
