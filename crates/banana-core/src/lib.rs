//! # Banana Core
//!
//! The shared vocabulary of the Banana plugin framework.
//!
//! Everything in this crate is either a plain data type used across the
//! framework or a seam towards the host game server. Nothing here owns
//! plugin state; that lives in `banana-framework`.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Host events**: typed event-argument descriptors ([`EventDescriptor`],
//!   [`HostEvent`]) and the process-wide [`HOST_EVENTS`] slice
//! - **Config values**: type tags and the typed conversion registry
//!   ([`TypeTag`], [`ConfigType`], [`ConversionRegistry`])
//! - **Permissions**: [`PermissionFlags`] bitset and [`RoleColor`]
//! - **Naming**: the underscored key convention ([`to_snake_case`])
//! - **Clock**: the injected [`Sleeper`] used by staged activation
//!
//! ### Integration Layer
//!
//! Interfaces implemented by the host (or by in-memory doubles):
//! - [`EventBus`] with the in-process [`LocalEventBus`]
//! - [`PermissionStore`] with [`MemoryPermissionStore`]
//! - [`HostInfo`] and the [`ServerReady`] lifecycle signal
//!
//! ```text
//! ┌────────────┐ attach/detach ┌──────────────┐
//! │ Framework  │──────────────▶│   EventBus   │◀── host publishes
//! │ (features, │               └──────────────┘
//! │   roles)   │ get/put       ┌──────────────┐
//! │            │──────────────▶│ PermissionSt.│
//! └────────────┘               └──────────────┘
//! ```

pub mod error;
pub mod foundation;
pub mod integration;

pub use error::{BindingError, BindingResult, ConvertError, ConvertResult};
pub use foundation::{
    ConfigType, ConversionRegistry, ConvertFn, EventDescriptor, EventHandler, HOST_EVENTS,
    HostEvent, HostEventFn, NoDelay, PermissionFlags, RoleColor, Sleeper, TokioSleeper, TypeTag,
    Value, keys_match, registered_host_events, to_snake_case, typed_handler,
};
pub use integration::{
    EventBus, HandlerId, HostInfo, LocalEventBus, MemoryPermissionStore, PermissionGroup,
    PermissionStore, ServerReady, StaticHost,
};

// Re-exported for `#[host_event]` expansions.
#[doc(hidden)]
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
