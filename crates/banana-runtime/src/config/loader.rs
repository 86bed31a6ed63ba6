//! Configuration loader using figment.
//!
//! Typed settings files are layered:
//!
//! 1. The caller's defaults
//! 2. The YAML file, when it exists
//! 3. Environment variables (`BANANA_*`), when enabled
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `BANANA_` prefix with `__` as
//! separator:
//!
//! - `BANANA_DEBUG=true` → `debug = true`
//! - `BANANA_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! let settings: LibrarySettings = ConfigLoader::new()
//!     .file(root.library_file())
//!     .load_or_create(LibrarySettings::default());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};

/// Default prefix of environment overrides.
pub const ENV_PREFIX: &str = "BANANA_";

/// Loader for one typed settings file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader reading `BANANA_*` environment variables and no file.
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    /// Sets the YAML file to layer over the defaults.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads environment variables with a custom prefix.
    pub fn with_env(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Loads `T` over `defaults`.
    pub fn load<T>(&self, defaults: T) -> ConfigResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut figment = Figment::from(Serialized::defaults(defaults));

        if let Some(path) = &self.file {
            trace!(path = %path.display(), "Layering configuration file");
            figment = figment.merge(Yaml::file(path));
        }

        if let Some(prefix) = &self.env_prefix {
            trace!(prefix = %prefix, "Loading environment variables");
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        Ok(figment.extract()?)
    }

    /// Loads `T`, creating the file from `defaults` when it does not exist.
    ///
    /// A file that exists but cannot be parsed is left alone; the defaults
    /// are used for the session and a warning is logged. A failed write is
    /// logged and the in-memory value stays authoritative.
    pub fn load_or_create<T>(&self, defaults: T) -> T
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let Some(path) = &self.file else {
            return self.load(defaults.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "Could not load configuration; using defaults");
                defaults
            });
        };

        if !path.exists() {
            info!(path = %path.display(), "Creating default configuration");
            if let Err(e) = write_yaml(path, &defaults) {
                warn!(path = %path.display(), error = %e, "Could not write default configuration");
            }
            return self.without_file().load(defaults.clone()).unwrap_or(defaults);
        }

        match self.load(defaults.clone()) {
            Ok(value) => {
                debug!(path = %path.display(), "Configuration loaded");
                value
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read configuration; using defaults");
                defaults
            }
        }
    }

    fn without_file(&self) -> Self {
        Self {
            file: None,
            env_prefix: self.env_prefix.clone(),
        }
    }
}

/// Serializes `value` to `path`, creating parent directories.
pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    let text = serde_yaml::to_string(value).map_err(|e| ConfigError::yaml(path, e))?;
    fs::write(path, text).map_err(|e| ConfigError::io(path, e))
}

/// Reads `path` as YAML.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    serde_yaml::from_str(&text).map_err(|e| ConfigError::yaml(path, e))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibrarySettings;
    use banana_framework::PluginSettings;
    use tracing_test::traced_test;

    #[test]
    fn missing_file_is_created_and_reads_back_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Demo").join("BananaSettings.yml");
        let loader = ConfigLoader::new().file(&path).without_env();
        let defaults = PluginSettings {
            logger_prefix: "DM".into(),
            ..Default::default()
        };

        let created = loader.load_or_create(defaults.clone());
        assert!(path.exists());
        assert_eq!(created, defaults);

        let again = loader.load_or_create(PluginSettings::default());
        assert_eq!(again, created);
        let raw: PluginSettings = read_yaml(&path).unwrap();
        assert_eq!(raw, created);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Banana.yml");
        fs::write(&path, "debug: true\nactivation_delay_ms: 10\nlogging:\n  level: warn\n").unwrap();

        let settings: LibrarySettings = ConfigLoader::new()
            .file(&path)
            .without_env()
            .load(LibrarySettings::default())
            .unwrap();

        assert!(settings.debug);
        assert!(settings.is_enabled);
        assert_eq!(settings.activation_delay_ms, 10);
        assert_eq!(settings.slow_activation_ms, 1000);
        assert_eq!(settings.logging.level.as_str(), "warn");
    }

    #[test]
    #[traced_test]
    fn malformed_file_falls_back_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BananaSettings.yml");
        fs::write(&path, "is_enabled: [oops\n").unwrap();

        let settings = ConfigLoader::new()
            .file(&path)
            .without_env()
            .load_or_create(PluginSettings::default());

        assert_eq!(settings, PluginSettings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "is_enabled: [oops\n");
        assert!(logs_contain("using defaults"));
    }
}
