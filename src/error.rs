//! Error types for plugin host operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::LifecycleState;

/// Errors that can occur during plugin host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// Candidate file is not a loadable module (bad format, missing symbol)
    #[error("Not a loadable module: {path:?}: {reason}")]
    ModuleNotLoadable { path: PathBuf, reason: String },

    /// Module loaded but declares a different interface
    #[error("Module {path:?} does not implement the plugin contract (declares '{found}')")]
    ContractNotImplemented { path: PathBuf, found: String },

    /// Module is conformant but creating or initializing the plugin failed
    #[error("Plugin instantiation failed for {path:?}: {reason}")]
    InstantiationFailed { path: PathBuf, reason: String },

    /// A plugin with this name is already registered
    #[error("Duplicate plugin name: {0}")]
    DuplicatePluginName(String),

    /// Plugin not found
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// Requested state change does not follow the lifecycle order
    #[error("Invalid lifecycle transition for '{name}': {from} -> {to}")]
    InvalidTransition {
        name: String,
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Entry cannot be removed before it is shutting down
    #[error("Plugin '{name}' is not ready for removal (state: {state})")]
    NotReady { name: String, state: LifecycleState },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub(crate) fn not_loadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModuleNotLoadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn instantiation(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::InstantiationFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for plugin host operations
pub type Result<T> = std::result::Result<T, HostError>;
