//! # Banana
//!
//! A feature, role and config framework for game-server plugins.
//!
//! ## Overview
//!
//! A plugin declares *features* (switchable units of functionality with a
//! persisted config section), *roles* (permission groups composed through
//! inheritance) and *server profiles* (which server this process runs as).
//! The runtime loads the declarations, hydrates their config files and
//! enables the features once the host is ready.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  load   ┌──────────────────────────────────────────┐
//! │   Runtime   │────────▶│ Plugin "Greetings"                       │
//! │ (config,    │         │   features ─▶ config overlay ─▶ bindings │──▶ host event bus
//! │  logging)   │────────▶│   roles ────▶ role composer ───────────▶ │──▶ host groups
//! └─────────────┘         └──────────────────────────────────────────┘
//! ```
//!
//! - **Core**: host event descriptors, config value tags, permission flags
//! - **Framework**: metadata registry, config overlay, feature lifecycle,
//!   role composition, event bindings
//! - **Runtime**: config files, logging, the plugin registry and orchestration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use banana::prelude::*;
//!
//! #[derive(Default, BananaConfig)]
//! pub struct Greeter {
//!     /// Sent to joining players.
//!     #[banana(config)]
//!     pub message: String,
//! }
//!
//! impl Feature for Greeter {
//!     fn name(&self) -> &str {
//!         "Greeter"
//!     }
//!
//!     fn enable(&mut self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//!
//!     fn disable(&mut self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! pub static GREETINGS: PluginDescriptor = PluginDescriptor::new("Greetings", || {
//!     PluginModule::builder("Greetings").feature::<Greeter>().build()
//! });
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = BananaRuntime::builder().config_root("./config").build();
//!     runtime.register_plugin(&GREETINGS)?;
//!     runtime.load()?;
//!     runtime.run_until_ready().await?;
//!     Ok(())
//! }
//! ```

pub use banana_core as core;
pub use banana_framework as framework;
pub use banana_runtime as runtime;

pub use banana_macros::{BananaConfig, ConfigEnum, banana_role, banana_server, host_event};

#[doc(hidden)]
pub mod __private {
    pub use serde_yaml;
}

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use banana::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use banana_runtime::{BananaRuntime, LibrarySettings};

    // Macros
    pub use banana_macros::{BananaConfig, ConfigEnum, banana_role, banana_server, host_event};

    // Plugin declarations
    pub use banana_framework::prelude::*;

    // Host seams
    pub use banana_core::{
        EventBus, HostEvent, HostInfo, PermissionFlags, PermissionStore, RoleColor, ServerReady,
    };

    // Logging macros
    pub use banana_runtime::prelude::*;
}
