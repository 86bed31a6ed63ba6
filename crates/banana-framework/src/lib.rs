//! # Banana Framework
//!
//! Plugin-facing building blocks of the Banana plugin framework.
//!
//! This layer provides:
//! - The metadata registry over host events and plugin declarations
//! - The config overlay engine behind `BananaFeatures.yml`
//! - The feature lifecycle manager with staged activation
//! - The role composition engine and group permissions
//! - The event binding manager
//! - Server profiles, plugin modules and plugin settings
//!
//! Nothing here touches the file system or installs a logger; the
//! `banana-runtime` crate wires these components to config files and the
//! host.

pub mod binding;
pub mod config;
pub mod error;
pub mod feature;
pub mod metadata;
pub mod plugin;
pub mod role;
pub mod server;

pub use binding::{BindingKey, BindingManager, EventBinding, InstanceId};
pub use config::{ConfigProperty, Configurable, SectionReport, ServerDefault, ServerMatch};
pub use error::{BoxError, DiscoveryError, FeatureError, FeatureResult, ServerError};
pub use feature::{
    ActivationReport, AsAny, Feature, FeatureCollection, FeatureDeclaration, FeatureInstance,
    FeatureManager, HydrateOutcome,
};
pub use metadata::{DescriptorIndex, EventMetadata, MetadataRegistry};
pub use plugin::{BANANA_PLUGIN_API_VERSION, PluginDescriptor, PluginHook, PluginModule, PluginSettings};
pub use role::{
    GroupPermissions, InheritRole, ResolvedRole, RoleCollection, RoleComposer, RoleDeclaration,
    RoleLoadState,
};
pub use server::{PrimaryMatch, ServerProfile, ServerProfileCollection, ServerTarget};

/// Prelude for plugin authors.
pub mod prelude {
    pub use crate::binding::EventBinding;
    pub use crate::config::{ConfigProperty, Configurable, ServerMatch};
    pub use crate::error::BoxError;
    pub use crate::feature::{Feature, FeatureDeclaration};
    pub use crate::plugin::{PluginDescriptor, PluginModule, PluginSettings};
    pub use crate::role::{InheritRole, RoleDeclaration};
    pub use crate::server::{ServerProfile, ServerTarget};
}
