//! Integration layer: interfaces towards the host game server.
//!
//! The host implements these traits; the in-memory implementations here are
//! used by tests and by hosts that route their own events through Banana.

pub mod bus;
pub mod host;
pub mod permission;

pub use bus::{EventBus, HandlerId, LocalEventBus};
pub use host::{HostInfo, ServerReady, StaticHost};
pub use permission::{MemoryPermissionStore, PermissionGroup, PermissionStore};
