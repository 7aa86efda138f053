//! Host for dynamically loaded plugins.
//!
//! A [`PluginManager`] scans a `plugins` directory next to the executable,
//! loads each shared library through libloading, checks that it exports a
//! [`PluginDeclaration`] for this crate's [`Plugin`] contract, initializes
//! the plugin and keeps it in a [`PluginRegistry`] until it is unloaded.
//! The presentation layer observes lifecycle events and reads plugin UI
//! surfaces through [`UiBinding`] handles.
//!
//! # Example
//!
//! ```rust,no_run
//! use dyn_plugin_host::{LoggingObserver, PluginConfig, PluginEvent, PluginManager};
//!
//! let mut manager = PluginManager::new(PluginConfig::default());
//! manager.subscribe(LoggingObserver);
//! manager.subscribe(|event: &PluginEvent| println!("{}", event));
//!
//! let report = manager.load_plugins();
//! for (path, error) in &report.failures {
//!     eprintln!("skipped {:?}: {}", path, error);
//! }
//!
//! if let Some(binding) = manager.get_plugin_ui_binding("VideoPlayer") {
//!     let entry = manager.with_ui_binding(&binding, |ui| ui.entry_point());
//!     println!("mount {:?}", entry);
//! }
//!
//! // Dropping the manager unloads every remaining plugin.
//! ```

mod config;
mod contract;
mod error;
mod events;
mod loader;
mod manager;
mod registry;

#[cfg(test)]
mod testing;

pub use config::*;
pub use contract::*;
pub use error::*;
pub use events::*;
pub use loader::*;
pub use manager::*;
pub use registry::*;

// Re-export for plugin crates that need raw library access
pub use libloading;
