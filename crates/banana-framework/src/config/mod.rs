//! Configurable properties and the config overlay engine.
//!
//! A feature exposes a table of [`ConfigProperty`] entries through
//! [`Configurable`]. Only properties in that table are ever read from or
//! written to `BananaFeatures.yml`; every other field is invisible to the
//! overlay even when its name collides with a persisted key.
//!
//! A property's effective value is layered:
//!
//! ```text
//! compiled default ─▶ per-server default ─▶ persisted YAML ─▶ runtime mutation
//!   (field init)      (first match wins)     (apply_patch)
//! ```
//!
//! The table is normally generated:
//!
//! ```rust,ignore
//! #[derive(Default, BananaConfig)]
//! pub struct Cooldowns {
//!     /// Seconds between two uses.
//!     #[banana(config, default_for_server(kind = "Event", value = 2))]
//!     pub cool_down_seconds: i64,
//!
//!     // not configurable
//!     pub uses: u32,
//! }
//! ```

mod overlay;

pub use overlay::{
    PatchOutcome, SectionReport, apply_patch, apply_section, apply_server_defaults,
    resolve_default, snapshot,
};

use banana_core::{ConvertError, ConvertResult, TypeTag, Value};

use crate::server::ServerProfile;

/// Types whose fields participate in the config overlay.
///
/// Usually derived with `#[derive(BananaConfig)]`. The defaults describe a
/// type with no configurable property.
pub trait Configurable {
    /// The configurable property table, in declaration order.
    fn config_properties(&self) -> Vec<ConfigProperty> {
        Vec::new()
    }

    /// Current value of the property serialized under `key`.
    fn read_property(&self, key: &str) -> Option<Value> {
        let _ = key;
        None
    }

    /// Assigns an already converted value to the property under `key`.
    fn write_property(&mut self, key: &str, value: Value) -> ConvertResult<()> {
        let _ = value;
        Err(ConvertError::UnknownProperty(key.to_string()))
    }
}

/// One configurable property.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigProperty {
    /// Serialization key (snake_case).
    pub key: &'static str,
    /// Declared type.
    pub type_tag: TypeTag,
    /// Human readable description.
    pub description: Option<&'static str>,
    /// Per-server defaults, in declaration order.
    pub server_defaults: Vec<ServerDefault>,
}

impl ConfigProperty {
    /// Declares a property.
    pub fn new(key: &'static str, type_tag: TypeTag) -> Self {
        Self {
            key,
            type_tag,
            description: None,
            server_defaults: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Adds a per-server default.
    pub fn server_default(mut self, target: ServerMatch, value: impl Into<Value>) -> Self {
        self.server_defaults.push(ServerDefault {
            target,
            value: value.into(),
        });
        self
    }
}

/// A default value that applies on matching servers only.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDefault {
    /// Servers this default applies to.
    pub target: ServerMatch,
    /// Raw value, converted like a persisted one.
    pub value: Value,
}

/// Server selector of a [`ServerDefault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMatch {
    /// Every server of this type.
    Kind(&'static str),
    /// The server with this id.
    Id(&'static str),
}

impl ServerMatch {
    /// Whether `profile` is selected.
    pub fn matches(&self, profile: &ServerProfile) -> bool {
        match self {
            Self::Kind(kind) => profile.kind == *kind,
            Self::Id(id) => profile.id == *id,
        }
    }
}
