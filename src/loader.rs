//! Plugin modules and the loader that creates them using libloading.

use std::any::Any;
use std::mem::ManuallyDrop;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::contract::{Plugin, PluginDeclaration, PLUGIN_DECLARATION_SYMBOL};
use crate::error::{HostError, Result};

/// Identity a plugin reported when its module was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// One loaded plugin: the library mapping plus the instance created from it.
///
/// The instance is always dropped before the library is closed.
pub struct PluginModule {
    path: PathBuf,
    info: PluginInfo,
    instance: ManuallyDrop<Box<dyn Plugin>>,
    /// `None` for plugins linked into the host binary
    library: Option<Library>,
}

impl PluginModule {
    /// Wrap a plugin instance that lives in the host binary.
    pub fn from_instance(path: impl Into<PathBuf>, instance: Box<dyn Plugin>) -> Result<Self> {
        let path = path.into();
        let info = match read_identity(&path, &*instance) {
            Ok(info) => info,
            Err(e) => {
                drop_instance(&path, instance);
                return Err(e);
            }
        };
        Ok(Self {
            path,
            info,
            instance: ManuallyDrop::new(instance),
            library: None,
        })
    }

    /// Instantiate a declaration that lives in the host binary.
    pub fn from_declaration(
        path: impl Into<PathBuf>,
        declaration: PluginDeclaration,
    ) -> Result<Self> {
        Self::instantiate(path.into(), declaration, None)
    }

    fn instantiate(
        path: PathBuf,
        declaration: PluginDeclaration,
        library: Option<Library>,
    ) -> Result<Self> {
        match create_instance(&path, declaration) {
            Ok((instance, info)) => Ok(Self {
                path,
                info,
                instance: ManuallyDrop::new(instance),
                library,
            }),
            Err(e) => {
                if let Some(library) = library {
                    close_library(&path, library);
                }
                Err(e)
            }
        }
    }

    /// File the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity reported at creation.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Registry key.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Whether the module is backed by a mapped shared library.
    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }

    pub(crate) fn plugin(&self) -> &dyn Plugin {
        &**self.instance
    }

    pub(crate) fn plugin_mut(&mut self) -> &mut dyn Plugin {
        &mut **self.instance
    }
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}

impl Drop for PluginModule {
    fn drop(&mut self) {
        let instance = &mut self.instance;
        // SAFETY: `instance` is never touched again after this point.
        if let Err(e) = guarded(|| unsafe { ManuallyDrop::drop(instance) }) {
            tracing::warn!("Plugin {} destructor {}", self.info.name, e);
        }
        if let Some(library) = self.library.take() {
            close_library(&self.path, library);
        }
    }
}

/// Turns a candidate path into a plugin module.
pub trait ModuleLoader {
    /// Load the module at `path`.
    ///
    /// Fails with `ModuleNotLoadable`, `ContractNotImplemented` or
    /// `InstantiationFailed`; a failed load leaves nothing mapped.
    fn load(&self, path: &Path) -> Result<PluginModule>;
}

/// Loads plugins from shared libraries.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path) -> Result<PluginModule> {
        // SAFETY: this maps native code and runs its initializers. Plugins run
        // with full host privilege and must be trusted.
        let library = unsafe { Library::new(path) }
            .map_err(|e| HostError::not_loadable(path, e))?;

        // SAFETY: the declaration is copied out while the library is mapped.
        let declaration = unsafe {
            library
                .get::<*const PluginDeclaration>(PLUGIN_DECLARATION_SYMBOL)
                .map(|symbol| symbol.read())
        };
        let declaration = match declaration {
            Ok(declaration) => declaration,
            Err(e) => {
                close_library(path, library);
                return Err(HostError::not_loadable(path, e));
            }
        };

        PluginModule::instantiate(path.to_path_buf(), declaration, Some(library))
    }
}

fn create_instance(
    path: &Path,
    declaration: PluginDeclaration,
) -> Result<(Box<dyn Plugin>, PluginInfo)> {
    if !declaration.is_conformant() {
        return Err(HostError::ContractNotImplemented {
            path: path.to_path_buf(),
            found: declaration.interface_id.to_string(),
        });
    }

    let instance =
        guarded(declaration.create).map_err(|e| HostError::instantiation(path, e))?;
    match read_identity(path, &*instance) {
        Ok(info) => Ok((instance, info)),
        Err(e) => {
            drop_instance(path, instance);
            Err(e)
        }
    }
}

/// Drop a plugin instance that never made it into a module.
fn drop_instance(path: &Path, instance: Box<dyn Plugin>) {
    if let Err(e) = guarded(move || drop(instance)) {
        tracing::warn!("Plugin instance from {:?} destructor {}", path, e);
    }
}

fn read_identity(path: &Path, plugin: &dyn Plugin) -> Result<PluginInfo> {
    let info = guarded(|| PluginInfo {
        name: plugin.name(),
        version: plugin.version(),
        description: plugin.description(),
    })
    .map_err(|e| HostError::instantiation(path, e))?;

    if info.name.is_empty() {
        return Err(HostError::instantiation(path, "plugin reported an empty name"));
    }
    Ok(info)
}

fn close_library(path: &Path, library: Library) {
    if let Err(e) = library.close() {
        tracing::warn!("Failed to unload library {:?}: {}", path, e);
    }
}

/// Run plugin code, turning a panic into an error message.
pub(crate) fn guarded<T>(call: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
