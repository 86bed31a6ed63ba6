//! Configuration module for the Banana runtime.
//!
//! Everything lives under one config root:
//!
//! ```text
//! <root>/
//! ├── Banana.yml                  library settings
//! └── <plugin name>/
//!     ├── BananaSettings.yml      plugin settings
//!     └── BananaFeatures.yml      feature sections
//! ```

pub mod error;
pub mod features;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use features::{load_feature_configs, read_features_document};
pub use loader::{ConfigLoader, ENV_PREFIX, read_yaml, write_yaml};
pub use schema::{LibrarySettings, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig};

use std::path::{Path, PathBuf};

/// File name of the library settings.
pub const LIBRARY_FILE: &str = "Banana.yml";
/// File name of a plugin's settings.
pub const SETTINGS_FILE: &str = "BananaSettings.yml";
/// File name of a plugin's feature sections.
pub const FEATURES_FILE: &str = "BananaFeatures.yml";

/// Paths below the config root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    root: PathBuf,
}

impl ConfigRoot {
    /// Uses `root` as the config root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<user config dir>/banana`, or `./banana` when the platform has no
    /// config directory.
    pub fn user_default() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("banana"))
    }

    /// The root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `Banana.yml`.
    pub fn library_file(&self) -> PathBuf {
        self.root.join(LIBRARY_FILE)
    }

    /// A plugin's directory.
    pub fn plugin_dir(&self, plugin: &str) -> PathBuf {
        self.root.join(plugin)
    }

    /// A plugin's `BananaSettings.yml`.
    pub fn settings_file(&self, plugin: &str) -> PathBuf {
        self.plugin_dir(plugin).join(SETTINGS_FILE)
    }

    /// A plugin's `BananaFeatures.yml`.
    pub fn features_file(&self, plugin: &str) -> PathBuf {
        self.plugin_dir(plugin).join(FEATURES_FILE)
    }
}
