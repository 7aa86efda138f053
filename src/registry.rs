//! Plugin registry: name to module mapping with lifecycle bookkeeping.
//!
//! The registry is owned by a single manager and mutated only from the
//! host's control thread, so it carries no locks.

use std::collections::HashMap;
use std::fmt;

use crate::error::{HostError, Result};
use crate::loader::PluginModule;

/// Lifecycle state of a registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Registered, `initialize` not yet returned
    Loading,
    /// `initialize` returned successfully
    Initialized,
    /// Visible to the presentation layer
    Active,
    /// UI binding withdrawn, `shutdown` running
    ShuttingDown,
    /// Terminal; the entry no longer exists
    Unloaded,
}

impl LifecycleState {
    /// Whether `next` directly follows `self` in the lifecycle.
    ///
    /// `Loading -> ShuttingDown` is allowed so a plugin whose `initialize`
    /// failed can be torn down through the normal path.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Loading, Initialized)
                | (Loading, ShuttingDown)
                | (Initialized, Active)
                | (Initialized, ShuttingDown)
                | (Active, ShuttingDown)
                | (ShuttingDown, Unloaded)
        )
    }

    /// Entries in this state are returned by lookups.
    pub fn is_visible(self) -> bool {
        self >= LifecycleState::Initialized && self != LifecycleState::Unloaded
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Loading => "loading",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Active => "active",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Unloaded => "unloaded",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct RegistryEntry {
    module: PluginModule,
    state: LifecycleState,
    generation: u64,
}

/// Authoritative name to module map.
pub struct PluginRegistry {
    entries: HashMap<String, RegistryEntry>,
    /// Names in insertion order
    order: Vec<String>,
    next_generation: u64,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states: Vec<_> = self
            .order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|e| (name.as_str(), e.state)))
            .collect();
        f.debug_struct("PluginRegistry")
            .field("entries", &states)
            .finish()
    }
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            next_generation: 1,
        }
    }

    /// Register a module in the `Loading` state.
    ///
    /// Returns the load generation assigned to this entry. Fails with
    /// `DuplicatePluginName` if the name is taken; the rejected module is
    /// dropped and the existing entry is untouched.
    pub fn insert(&mut self, name: impl Into<String>, module: PluginModule) -> Result<u64> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(HostError::DuplicatePluginName(name));
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        tracing::debug!("Registered plugin {} (generation {})", name, generation);
        self.order.push(name.clone());
        self.entries.insert(
            name,
            RegistryEntry {
                module,
                state: LifecycleState::Loading,
                generation,
            },
        );
        Ok(generation)
    }

    /// Move an entry to `next`, returning the previous state.
    ///
    /// Entries only reach `Unloaded` through [`remove`](Self::remove).
    pub fn transition(&mut self, name: &str, next: LifecycleState) -> Result<LifecycleState> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| HostError::PluginNotFound(name.to_string()))?;

        let current = entry.state;
        if next == LifecycleState::Unloaded || !current.can_transition_to(next) {
            return Err(HostError::InvalidTransition {
                name: name.to_string(),
                from: current,
                to: next,
            });
        }

        tracing::debug!("Plugin {}: {} -> {}", name, current, next);
        entry.state = next;
        Ok(current)
    }

    /// Remove a `ShuttingDown` entry and hand back its module for disposal.
    pub fn remove(&mut self, name: &str) -> Result<PluginModule> {
        let state = self
            .state(name)
            .ok_or_else(|| HostError::PluginNotFound(name.to_string()))?;

        if state != LifecycleState::ShuttingDown {
            return Err(HostError::NotReady {
                name: name.to_string(),
                state,
            });
        }

        self.order.retain(|n| n != name);
        self.entries
            .remove(name)
            .map(|entry| entry.module)
            .ok_or_else(|| HostError::PluginNotFound(name.to_string()))
    }

    /// Look up an initialized plugin. `Loading` entries are never returned.
    pub fn lookup(&self, name: &str) -> Option<&PluginModule> {
        self.entries
            .get(name)
            .filter(|e| e.state.is_visible())
            .map(|e| &e.module)
    }

    /// Snapshot of visible plugin names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| self.lookup(name).is_some())
            .cloned()
            .collect()
    }

    /// Current state of an entry, whatever its visibility.
    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        self.entries.get(name).map(|e| e.state)
    }

    /// Load generation of an entry.
    pub fn generation(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|e| e.generation)
    }

    /// Check if a name is registered in any state.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn module_mut(&mut self, name: &str) -> Option<&mut PluginModule> {
        self.entries.get_mut(name).map(|e| &mut e.module)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
