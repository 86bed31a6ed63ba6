//! Foundation layer: plain types shared by every other crate.

pub mod clock;
pub mod color;
pub mod event;
pub mod flags;
pub mod naming;
pub mod value;

pub use clock::{NoDelay, Sleeper, TokioSleeper};
pub use color::RoleColor;
pub use event::{
    EventDescriptor, EventHandler, HOST_EVENTS, HostEvent, HostEventFn, registered_host_events,
    typed_handler,
};
pub use flags::PermissionFlags;
pub use naming::{keys_match, to_snake_case};
pub use value::{ConfigType, ConversionRegistry, ConvertFn, TypeTag, Value};
