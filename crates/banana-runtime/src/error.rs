//! Runtime error types.

use thiserror::Error;

use banana_framework::{BoxError, FeatureError};

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A feature transition failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Plugin built against an incompatible API version.
    #[error("Plugin '{plugin}' targets API version {api_version:#010x}")]
    Incompatible {
        /// Plugin name.
        plugin: String,
        /// Version the plugin was built against.
        api_version: u32,
    },

    /// A plugin with this name is already registered.
    #[error("Plugin already registered: {0}")]
    PluginExists(String),

    /// No plugin with this name is loaded.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// A plugin-level hook failed.
    #[error("Plugin '{plugin}' hook failed: {source}")]
    Hook {
        /// Plugin name.
        plugin: String,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// The runtime has not been loaded.
    #[error("Runtime is not loaded")]
    NotLoaded,

    /// The ready signal can no longer fire.
    #[error("Ready signal was dropped before it fired")]
    ReadySignalLost,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
