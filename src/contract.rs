//! The contract every plugin implements and the symbol it exports.
//!
//! A plugin library exposes one static, [`PluginDeclaration`], under the
//! well-known symbol [`PLUGIN_DECLARATION_SYMBOL`]. The host reads the
//! declaration, checks that its interface identifier equals
//! [`PLUGIN_INTERFACE_ID`], and calls its constructor to obtain the
//! [`Plugin`] trait object. Plugin crates normally use [`export_plugin!`]
//! instead of writing the static by hand:
//!
//! ```rust,ignore
//! use dyn_plugin_host::{export_plugin, HookResult, Plugin};
//!
//! #[derive(Default)]
//! pub struct VideoPlugin;
//!
//! impl Plugin for VideoPlugin {
//!     fn name(&self) -> String { "VideoPlayer".into() }
//!     fn version(&self) -> String { "1.0".into() }
//!     fn description(&self) -> String { "Video Player Plugin".into() }
//!     fn initialize(&mut self) -> HookResult { Ok(()) }
//!     fn shutdown(&mut self) -> HookResult { Ok(()) }
//! }
//!
//! export_plugin!(VideoPlugin::default);
//! ```

use thiserror::Error;

/// Identifier a module must declare to be accepted as a plugin.
pub const PLUGIN_INTERFACE_ID: &str = "dyn_plugin_host.Plugin";

/// Name of the exported declaration static (NUL-terminated for symbol lookup).
pub const PLUGIN_DECLARATION_SYMBOL: &[u8] = b"plugin_declaration\0";

/// Error reported by a plugin lifecycle hook.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result of a plugin lifecycle hook.
pub type HookResult = std::result::Result<(), HookError>;

/// Capability set every plugin provides.
///
/// The host only calls the identity getters before `initialize` has
/// returned. `shutdown` is called at most once and must cope with a
/// plugin whose `initialize` failed partway.
pub trait Plugin {
    /// Stable unique name; used as the registry key.
    fn name(&self) -> String;

    fn version(&self) -> String;

    fn description(&self) -> String;

    /// Set up plugin resources. Called exactly once per load.
    fn initialize(&mut self) -> HookResult;

    /// Release plugin resources. Called exactly once per unload.
    fn shutdown(&mut self) -> HookResult;

    /// Surface consumed by the presentation layer, if the plugin has one.
    fn ui_binding(&self) -> Option<&dyn UiSurface> {
        None
    }
}

/// Presentation-facing object a plugin offers.
///
/// The host never interprets these values; it only hands them to the
/// presentation layer while the plugin is active.
pub trait UiSurface {
    /// Resource the presentation layer mounts (e.g. a QML or HTML path).
    fn entry_point(&self) -> String;

    /// Read a named property.
    fn property(&self, _key: &str) -> Option<String> {
        None
    }

    /// Write a named property. Returns true if the surface accepted it.
    fn set_property(&self, _key: &str, _value: &str) -> bool {
        false
    }
}

/// Static exported by every plugin library.
#[derive(Debug, Clone, Copy)]
pub struct PluginDeclaration {
    /// Must equal [`PLUGIN_INTERFACE_ID`]
    pub interface_id: &'static str,
    /// Creates the plugin instance
    pub create: fn() -> Box<dyn Plugin>,
}

impl PluginDeclaration {
    /// Whether this declaration targets the host's plugin contract.
    pub fn is_conformant(&self) -> bool {
        self.interface_id == PLUGIN_INTERFACE_ID
    }
}

/// Export a plugin type from a `cdylib` crate.
///
/// Takes a path to a zero-argument constructor returning a [`Plugin`]
/// implementor.
#[macro_export]
macro_rules! export_plugin {
    ($constructor:path) => {
        #[doc(hidden)]
        #[allow(non_upper_case_globals)]
        #[no_mangle]
        pub static plugin_declaration: $crate::PluginDeclaration = $crate::PluginDeclaration {
            interface_id: $crate::PLUGIN_INTERFACE_ID,
            create: {
                fn __create_plugin() -> ::std::boxed::Box<dyn $crate::Plugin> {
                    ::std::boxed::Box::new($constructor())
                }
                __create_plugin
            },
        };
    };
}
