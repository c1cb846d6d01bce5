//! Host services for the terminal.
//!
//! Toasts are printed to stderr, navigation only records the requested hash
//! and custom actions are logged.

use std::sync::Mutex;

use async_trait::async_trait;
use colored::Colorize;
use forge_ui::{
    Action, CustomActionHandler, DataStore, Navigator, Notifier, Value, schema::ToastVariant,
};

/// Prints toasts to stderr, coloured by variant.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn toast(&self, variant: ToastVariant, message: &str) {
        let tag = format!("[{variant}]");
        let tag = match variant {
            ToastVariant::Success => tag.green(),
            ToastVariant::Error => tag.red(),
            ToastVariant::Info => tag.blue(),
            ToastVariant::Warning => tag.yellow(),
        };
        eprintln!("{} {message}", tag.bold());
    }
}

/// Remembers the last location hash requested.
#[derive(Debug, Default)]
pub struct HashNavigator {
    hash: Mutex<Option<String>>,
}

impl HashNavigator {
    pub fn current(&self) -> Option<String> {
        self.hash.lock().ok().and_then(|h| h.clone())
    }
}

impl Navigator for HashNavigator {
    fn navigate(&self, path: &str) {
        info!("navigate to #{}", path.trim_start_matches('#'));
        if let Ok(mut hash) = self.hash.lock() {
            *hash = Some(path.to_string());
        }
    }
}

/// Logs custom actions without touching the data store.
#[derive(Debug, Default)]
pub struct LoggingCustomHandler;

#[async_trait]
impl CustomActionHandler for LoggingCustomHandler {
    async fn execute(
        &self,
        action: &Action,
        event: Option<&Value>,
        _store: &mut DataStore,
    ) -> anyhow::Result<()> {
        info!(
            "custom action `{}` target={:?} params={} event={}",
            action.id,
            action.target,
            action.params.as_ref().map(Value::to_string).unwrap_or_default(),
            event.map(Value::to_string).unwrap_or_default(),
        );
        Ok(())
    }
}
