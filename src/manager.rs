//! Plugin manager: discovery, load, unload and teardown.

use std::path::{Path, PathBuf};

use crate::config::PluginConfig;
use crate::contract::UiSurface;
use crate::error::{HostError, Result};
use crate::events::{ObserverId, ObserverList, PluginEvent, PluginObserver};
use crate::loader::{guarded, DylibLoader, ModuleLoader, PluginInfo};
use crate::registry::{LifecycleState, PluginRegistry};

/// Non-owning handle to an active plugin's UI surface.
///
/// Resolve it with [`PluginManager::with_ui_binding`]. A handle stops
/// resolving once its plugin leaves the active state, and never resolves
/// against a later load of the same plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UiBinding {
    plugin: String,
    generation: u64,
}

impl UiBinding {
    /// Name of the plugin that offered this binding.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

/// Outcome of a directory scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Plugins loaded by this scan, in load order
    pub loaded: Vec<String>,
    /// Candidates (or directories) that failed, with the reason
    pub failures: Vec<(PathBuf, HostError)>,
}

impl ScanReport {
    /// True if every candidate loaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns every loaded plugin and is the only caller of plugin code.
///
/// All methods are meant to be called from one control thread. Dropping
/// the manager unloads every remaining plugin.
pub struct PluginManager {
    config: PluginConfig,
    loader: Box<dyn ModuleLoader>,
    registry: PluginRegistry,
    observers: ObserverList,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("observers", &self.observers)
            .finish()
    }
}

impl PluginManager {
    /// Create a manager that loads shared libraries.
    pub fn new(config: PluginConfig) -> Self {
        Self::with_loader(config, Box::new(DylibLoader))
    }

    /// Create a manager with a custom module loader.
    pub fn with_loader(config: PluginConfig, loader: Box<dyn ModuleLoader>) -> Self {
        tracing::debug!("PluginManager initialized for {:?}", config.plugins_dir);
        Self {
            config,
            loader,
            registry: PluginRegistry::new(),
            observers: ObserverList::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Read-only view of the registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    // === Notifications ===

    /// Register an observer for lifecycle events.
    pub fn subscribe(&mut self, observer: impl PluginObserver + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn notify(&self, event: PluginEvent) {
        self.observers.publish(&event);
    }

    // === Discovery ===

    /// Scan the configured directories and try to load every regular file.
    ///
    /// The listing is taken once before loading starts. A failing candidate
    /// is logged and recorded in the report; the scan always runs to the end.
    pub fn load_plugins(&mut self) -> ScanReport {
        let mut report = ScanReport::default();
        let candidates = self.scan_candidates(&mut report);
        tracing::debug!("Scanning {} plugin candidates", candidates.len());

        for path in candidates {
            match self.load_plugin(&path) {
                Ok(name) => report.loaded.push(name),
                Err(e) => report.failures.push((path, e)),
            }
        }

        tracing::debug!(
            "Plugin scan finished: {} loaded, {} failed",
            report.loaded.len(),
            report.failures.len()
        );
        report
    }

    fn scan_candidates(&self, report: &mut ScanReport) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        for dir in self.config.search_dirs() {
            if !dir.is_dir() {
                tracing::debug!("Plugins directory not found: {:?}", dir);
                continue;
            }
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.clone());

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Cannot read plugins directory {:?}: {}", dir, e);
                    report.failures.push((dir, HostError::Io(e)));
                    continue;
                }
            };

            let mut files = Vec::new();
            for entry in entries {
                match entry {
                    Ok(entry) => files.push(entry.path()),
                    Err(e) => tracing::warn!("Cannot read entry in {:?}: {}", dir, e),
                }
            }
            files.retain(|path| path.is_file());
            files.sort();
            candidates.extend(files);
        }

        candidates
    }

    // === Lifecycle ===

    /// Load, register and initialize the plugin at `path`.
    ///
    /// Returns the plugin name. On failure nothing stays registered and the
    /// module is released.
    pub fn load_plugin(&mut self, path: &Path) -> Result<String> {
        let module = self.loader.load(path).map_err(|e| {
            tracing::warn!("Failed to load plugin {:?}: {}", path, e);
            e
        })?;

        let name = module.name().to_string();
        if let Err(e) = self.registry.insert(name.clone(), module) {
            tracing::warn!("Rejected plugin {:?}: {}", path, e);
            return Err(e);
        }

        if let Err(e) = self.activate(&name, path) {
            tracing::warn!("Failed to initialize plugin {}: {}", name, e);
            self.discard(&name);
            return Err(e);
        }

        tracing::info!("Plugin loaded successfully: {}", name);
        self.notify(PluginEvent::Loaded(name.clone()));
        self.notify(PluginEvent::RegistryChanged);
        Ok(name)
    }

    fn activate(&mut self, name: &str, path: &Path) -> Result<()> {
        let module = self
            .registry
            .module_mut(name)
            .ok_or_else(|| HostError::PluginNotFound(name.to_string()))?;

        let reason = match guarded(|| module.plugin_mut().initialize()) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("initialize failed: {}", e)),
            Err(panic) => Some(format!("initialize {}", panic)),
        };
        if let Some(reason) = reason {
            return Err(HostError::instantiation(path, reason));
        }

        self.registry.transition(name, LifecycleState::Initialized)?;
        self.registry.transition(name, LifecycleState::Active)?;
        Ok(())
    }

    /// Tear down a plugin whose activation failed. No notifications are sent.
    fn discard(&mut self, name: &str) {
        if let Err(e) = self.registry.transition(name, LifecycleState::ShuttingDown) {
            tracing::error!("Cannot roll back plugin {}: {}", name, e);
            return;
        }
        if let Err(e) = self.run_shutdown(name) {
            tracing::warn!("Plugin {} shutdown after failed initialize: {}", name, e);
        }
        if let Err(e) = self.registry.remove(name) {
            tracing::error!("Cannot remove plugin {}: {}", name, e);
        }
    }

    fn run_shutdown(&mut self, name: &str) -> std::result::Result<(), String> {
        let Some(module) = self.registry.module_mut(name) else {
            return Ok(());
        };
        match guarded(|| module.plugin_mut().shutdown()) {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(panic) => Err(panic),
        }
    }

    /// Shut down and unload a plugin.
    ///
    /// The UI binding is withdrawn before `shutdown` runs. A failing
    /// `shutdown` hook is logged and the unload still completes.
    pub fn unload_plugin(&mut self, name: &str) -> Result<()> {
        if !self.registry.contains(name) {
            tracing::warn!("Plugin not found: {}", name);
            return Err(HostError::PluginNotFound(name.to_string()));
        }

        self.registry
            .transition(name, LifecycleState::ShuttingDown)
            .map_err(|e| {
                tracing::warn!("Cannot unload plugin {}: {}", name, e);
                e
            })?;
        self.notify(PluginEvent::UiBindingWithdrawn(name.to_string()));

        if let Err(e) = self.run_shutdown(name) {
            tracing::warn!("Plugin {} shutdown failed: {}", name, e);
        }

        let module = self.registry.remove(name)?;
        drop(module);

        tracing::info!("Plugin unloaded successfully: {}", name);
        self.notify(PluginEvent::Unloaded(name.to_string()));
        self.notify(PluginEvent::RegistryChanged);
        Ok(())
    }

    /// Unload every plugin, most recently loaded first.
    ///
    /// Returns the plugins that failed to unload; a failure never stops the
    /// remaining unloads.
    pub fn shutdown_all(&mut self) -> Vec<(String, HostError)> {
        let mut failures = Vec::new();
        for name in self.registry.names().into_iter().rev() {
            if let Err(e) = self.unload_plugin(&name) {
                tracing::error!("Error unloading plugin {}: {}", name, e);
                failures.push((name, e));
            }
        }
        failures
    }

    // === Queries ===

    /// Names of loaded plugins in load order.
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Check if a plugin is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.registry.lookup(name).is_some()
    }

    /// Identity of a loaded plugin.
    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.registry.lookup(name).map(|m| m.info().clone())
    }

    /// Lifecycle state of a plugin, `None` if absent.
    pub fn plugin_state(&self, name: &str) -> Option<LifecycleState> {
        self.registry.state(name)
    }

    /// UI binding of an active plugin, or `None` if the plugin is absent,
    /// not active, or has no UI surface.
    pub fn get_plugin_ui_binding(&self, name: &str) -> Option<UiBinding> {
        if self.registry.state(name)? != LifecycleState::Active {
            return None;
        }
        let module = self.registry.lookup(name)?;

        let has_surface = guarded(|| module.plugin().ui_binding().is_some())
            .unwrap_or_else(|e| {
                tracing::warn!("Plugin {} ui_binding {}", name, e);
                false
            });
        if !has_surface {
            return None;
        }

        Some(UiBinding {
            plugin: name.to_string(),
            generation: self.registry.generation(name)?,
        })
    }

    /// Whether `binding` still refers to an active plugin instance.
    pub fn is_binding_valid(&self, binding: &UiBinding) -> bool {
        self.registry.state(&binding.plugin) == Some(LifecycleState::Active)
            && self.registry.generation(&binding.plugin) == Some(binding.generation)
    }

    /// Run `f` against the surface behind `binding`.
    ///
    /// Returns `None` if the binding was withdrawn. `f` mostly calls into the
    /// plugin's surface, so it runs inside the same panic guard as every
    /// other plugin call: a panic in `f` is logged and also yields `None`.
    pub fn with_ui_binding<R>(
        &self,
        binding: &UiBinding,
        f: impl FnOnce(&dyn UiSurface) -> R,
    ) -> Option<R> {
        if !self.is_binding_valid(binding) {
            return None;
        }
        let module = self.registry.lookup(&binding.plugin)?;

        guarded(|| module.plugin().ui_binding().map(f)).unwrap_or_else(|e| {
            tracing::warn!("UI binding access for {} {}", binding.plugin, e);
            None
        })
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            self.shutdown_all();
        }
    }
}
