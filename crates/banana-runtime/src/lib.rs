//! Banana Runtime - Orchestration layer for the Banana plugin framework.
//!
//! This crate provides:
//! - Runtime orchestration (`BananaRuntime`)
//! - The registry of loaded plugins (`PluginRegistry`)
//! - Config files below the config root (`Banana.yml`, `BananaSettings.yml`,
//!   `BananaFeatures.yml`)
//! - Logging configuration
//!
//! # Config layout
//!
//! ```text
//! <root>/Banana.yml
//! <root>/<Plugin>/BananaSettings.yml
//! <root>/<Plugin>/BananaFeatures.yml
//! ```
//!
//! Missing files are created with defaults. `Banana.yml` may also be
//! overridden from `BANANA_*` environment variables, e.g.
//! `BANANA_LOGGING__LEVEL=debug`.
//!
//! ```ignore
//! use banana_runtime::BananaRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BananaRuntime::builder()
//!         .config_root("./config")
//!         .build();
//!
//!     runtime.register_plugin(&my_plugin::PLUGIN)?;
//!     runtime.load()?;
//!
//!     // Roles are composed and features enabled once the host is ready
//!     runtime.run_until_ready().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, ConfigRoot, LibrarySettings, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use registry::{LoadedPlugin, PluginRegistry, RegistryStats};
pub use runtime::{BananaRuntime, RuntimeBuilder};

// Re-export tracing for use by plugins
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
