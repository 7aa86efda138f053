//! Plugin host configuration.

use std::path::PathBuf;

/// Name of the directory, next to the host executable, that holds plugins.
pub const PLUGINS_DIR_NAME: &str = "plugins";

/// Configuration for the plugin manager.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Primary directory scanned by `load_plugins`
    pub plugins_dir: PathBuf,

    /// Additional directories scanned after `plugins_dir`, in order
    pub extra_dirs: Vec<PathBuf>,
}

impl PluginConfig {
    /// Create a configuration scanning a single directory.
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            extra_dirs: Vec::new(),
        }
    }

    /// Create a configuration for the `plugins` directory beside the running executable.
    pub fn from_executable() -> std::io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Executable has no parent directory: {:?}", exe),
            )
        })?;
        Ok(Self::new(dir.join(PLUGINS_DIR_NAME)))
    }

    /// Add a directory to scan after the primary one.
    pub fn with_extra_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_dirs.push(dir.into());
        self
    }

    /// Add the per-user plugins directory (`<data dir>/<app>/plugins`).
    ///
    /// Does nothing on platforms without a user data directory.
    pub fn with_user_plugins_dir(self, app_name: &str) -> Self {
        match dirs::data_dir() {
            Some(data_dir) => self.with_extra_dir(data_dir.join(app_name).join(PLUGINS_DIR_NAME)),
            None => self,
        }
    }

    /// All directories to scan, primary first.
    pub fn search_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.plugins_dir).chain(self.extra_dirs.iter())
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::from_executable()
            .unwrap_or_else(|_| Self::new(PathBuf::from(".").join(PLUGINS_DIR_NAME)))
    }
}
