//! Plugin modules.
//!
//! A [`PluginModule`] bundles everything one plugin declares: its feature
//! declarations, roles and server profiles, the defaults of its settings
//! file, and optional lifecycle hooks. Modules are built explicitly with
//! [`PluginModule::builder`]; there is no runtime type scanning.
//!
//! A [`PluginDescriptor`] is the static, `Copy` handle to a plugin. It
//! carries only the name, the API version and a factory function.
//!
//! ```rust,ignore
//! fn build() -> PluginModule {
//!     PluginModule::builder("Greetings")
//!         .version("1.2.0")
//!         .feature::<Greeter>()
//!         .role(MODERATOR)
//!         .server(EU_MAIN)
//!         .build()
//! }
//!
//! pub static GREETINGS: PluginDescriptor = PluginDescriptor::new("Greetings", build);
//! ```

mod settings;

pub use settings::PluginSettings;

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::feature::{Feature, FeatureDeclaration};
use crate::role::RoleDeclaration;
use crate::server::ServerProfile;

/// A plugin-level lifecycle hook.
pub type PluginHook = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

// ============================================================================
// PluginModule
// ============================================================================

/// Everything one plugin declares.
#[derive(Clone)]
pub struct PluginModule {
    name: String,
    version: String,
    settings: PluginSettings,
    features: Vec<FeatureDeclaration>,
    roles: Vec<RoleDeclaration>,
    servers: Vec<ServerProfile>,
    on_enabled: Option<PluginHook>,
    on_disabled: Option<PluginHook>,
}

impl PluginModule {
    /// Starts building a module.
    pub fn builder(name: impl Into<String>) -> PluginModuleBuilder {
        PluginModuleBuilder {
            module: PluginModule {
                name: name.into(),
                version: "0.0.0".to_string(),
                settings: PluginSettings::default(),
                features: Vec::new(),
                roles: Vec::new(),
                servers: Vec::new(),
                on_enabled: None,
                on_disabled: None,
            },
        }
    }

    /// Plugin name; also the name of its config directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plugin version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Settings used when `BananaSettings.yml` is missing.
    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Feature declarations, in declaration order.
    pub fn features(&self) -> &[FeatureDeclaration] {
        &self.features
    }

    /// Role declarations.
    pub fn roles(&self) -> &[RoleDeclaration] {
        &self.roles
    }

    /// Server profiles.
    pub fn servers(&self) -> &[ServerProfile] {
        &self.servers
    }

    /// Hook run after the plugin's features are loaded.
    pub fn on_enabled(&self) -> Option<&PluginHook> {
        self.on_enabled.as_ref()
    }

    /// Hook run after the plugin's features are unloaded.
    pub fn on_disabled(&self) -> Option<&PluginHook> {
        self.on_disabled.as_ref()
    }
}

impl fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginModule")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("features", &self.features.len())
            .field("roles", &self.roles.len())
            .field("servers", &self.servers.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PluginModule`].
pub struct PluginModuleBuilder {
    module: PluginModule,
}

impl PluginModuleBuilder {
    /// Sets the version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.module.version = version.into();
        self
    }

    /// Sets the log prefix of the default settings.
    pub fn logger_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.module.settings.logger_prefix = prefix.into();
        self
    }

    /// Replaces the default settings.
    pub fn settings(mut self, settings: PluginSettings) -> Self {
        self.module.settings = settings;
        self
    }

    /// Declares a feature built from its `Default`.
    pub fn feature<F: Feature + Default>(self) -> Self {
        self.feature_declaration(FeatureDeclaration::of::<F>())
    }

    /// Declares a feature with a prepared declaration.
    pub fn feature_declaration(mut self, declaration: FeatureDeclaration) -> Self {
        self.module.features.push(declaration);
        self
    }

    /// Declares a role.
    pub fn role(mut self, role: RoleDeclaration) -> Self {
        self.module.roles.push(role);
        self
    }

    /// Declares a server profile.
    pub fn server(mut self, server: ServerProfile) -> Self {
        self.module.servers.push(server);
        self
    }

    /// Sets the hook run after the plugin's features are loaded.
    pub fn on_enabled<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.module.on_enabled = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after the plugin's features are unloaded.
    pub fn on_disabled<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.module.on_disabled = Some(Arc::new(hook));
        self
    }

    /// Finishes the module.
    pub fn build(self) -> PluginModule {
        self.module
    }
}

// ============================================================================
// PluginDescriptor
// ============================================================================

/// Current Banana plugin API version (1.0).
pub const BANANA_PLUGIN_API_VERSION: u32 = 0x0001_0000;

/// A static, `Copy` descriptor that identifies and instantiates a plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Plugin API version this descriptor was compiled against.
    pub api_version: u32,
    /// Plugin name.
    pub name: &'static str,
    /// Factory building the plugin's module.
    pub create: fn() -> PluginModule,
}

impl PluginDescriptor {
    /// A descriptor for the current API version.
    pub const fn new(name: &'static str, create: fn() -> PluginModule) -> Self {
        Self {
            api_version: BANANA_PLUGIN_API_VERSION,
            name,
            create,
        }
    }

    /// Returns `true` if this descriptor's API version is compatible with the
    /// running framework.
    ///
    /// The major part must match exactly; the descriptor's minor part must be
    /// ≤ the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = BANANA_PLUGIN_API_VERSION >> 16;
        let host_minor = BANANA_PLUGIN_API_VERSION & 0xFFFF;
        let desc_major = self.api_version >> 16;
        let desc_minor = self.api_version & 0xFFFF;
        desc_major == host_major && desc_minor <= host_minor
    }

    /// Builds the plugin's module.
    #[inline]
    pub fn instantiate(&self) -> PluginModule {
        (self.create)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testing::Probe;

    fn build() -> PluginModule {
        PluginModule::builder("Demo")
            .version("1.0.0")
            .logger_prefix("DM")
            .feature::<Probe>()
            .role(RoleDeclaration::new("helper", 1))
            .server(ServerProfile::new("Main", "EU Main", "eu1", 7777))
            .on_enabled(|| Ok(()))
            .build()
    }

    #[test]
    fn builder_collects_declarations() {
        let module = build();
        assert_eq!(module.name(), "Demo");
        assert_eq!(module.settings().logger_prefix, "DM");
        assert_eq!(module.features().len(), 1);
        assert_eq!(module.roles()[0].name, "helper");
        assert_eq!(module.servers()[0].id, "eu1");
        assert!(module.on_enabled().is_some());
        assert!(module.on_disabled().is_none());
    }

    #[test]
    fn descriptor_version_check() {
        let descriptor = PluginDescriptor::new("Demo", build);
        assert!(descriptor.is_compatible());
        assert_eq!(descriptor.instantiate().version(), "1.0.0");

        let newer = PluginDescriptor {
            api_version: BANANA_PLUGIN_API_VERSION + 1,
            ..descriptor
        };
        assert!(!newer.is_compatible());
        let next_major = PluginDescriptor {
            api_version: 0x0002_0000,
            ..descriptor
        };
        assert!(!next_major.is_compatible());
    }
}
