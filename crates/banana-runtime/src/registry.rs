//! Registry of loaded plugins.
//!
//! The registry is an explicit object owned by the runtime rather than
//! process-wide state; tests build one per case.

use std::path::PathBuf;
use std::sync::Arc;

use banana_framework::{
    FeatureCollection, PluginModule, PluginSettings, ServerError, ServerProfileCollection,
};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

/// One plugin after loading.
#[derive(Debug)]
pub struct LoadedPlugin {
    /// The plugin's declarations.
    pub module: PluginModule,
    /// Settings read from `BananaSettings.yml`.
    pub settings: PluginSettings,
    /// Declared servers and the resolved primary profile.
    pub servers: ServerProfileCollection,
    /// Primary resolution failure, if servers were declared but none matched.
    pub server_error: Option<ServerError>,
    /// Live features.
    pub features: Mutex<FeatureCollection>,
    /// The plugin's config directory.
    pub config_dir: PathBuf,
}

impl LoadedPlugin {
    /// Plugin name.
    pub fn name(&self) -> &str {
        self.module.name()
    }

    /// Log prefix.
    pub fn logger_prefix(&self) -> &str {
        &self.settings.logger_prefix
    }
}

/// Loaded plugins, in load order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<LoadedPlugin>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loaded plugin.
    pub fn insert(&self, plugin: LoadedPlugin) -> Arc<LoadedPlugin> {
        let plugin = Arc::new(plugin);
        debug!(plugin = %plugin.name(), "Registered loaded plugin");
        self.plugins.write().push(Arc::clone(&plugin));
        plugin
    }

    /// Looks a plugin up by exact name, then by name prefix.
    pub fn get(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        let plugins = self.plugins.read();
        plugins
            .iter()
            .find(|p| p.name() == name)
            .or_else(|| plugins.iter().find(|p| p.name().starts_with(name)))
            .cloned()
    }

    /// Snapshot of every plugin, in load order.
    pub fn all(&self) -> Vec<Arc<LoadedPlugin>> {
        self.plugins.read().clone()
    }

    /// Plugin names, in load order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().iter().map(|p| p.name().to_string()).collect()
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// Returns `true` if nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Removes every plugin, returning them in load order.
    pub fn clear(&self) -> Vec<Arc<LoadedPlugin>> {
        std::mem::take(&mut *self.plugins.write())
    }

    /// Returns statistics about the registry.
    pub fn stats(&self) -> RegistryStats {
        let plugins = self.plugins.read();
        let mut stats = RegistryStats {
            plugins: plugins.len(),
            ..Default::default()
        };
        for plugin in plugins.iter() {
            let features = plugin.features.lock();
            stats.features += features.len();
            stats.enabled += features.iter().filter(|f| f.is_enabled()).count();
            if plugin.servers.primary().is_none() && !plugin.servers.is_empty() {
                stats.unresolved_servers += 1;
            }
        }
        stats
    }
}

/// Statistics about the plugin registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of loaded plugins.
    pub plugins: usize,
    /// Number of live features.
    pub features: usize,
    /// Number of enabled features.
    pub enabled: usize,
    /// Plugins that declare servers but resolved no primary profile.
    pub unresolved_servers: usize,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plugins: {} ({} features, {} enabled, {} without primary server)",
            self.plugins, self.features, self.enabled, self.unresolved_servers
        )
    }
}
