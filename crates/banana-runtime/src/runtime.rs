//! Main runtime orchestration.
//!
//! [`BananaRuntime`] owns every registry of the framework and drives the
//! plugin lifecycle against the host:
//!
//! ```text
//!  register ──▶ load ──▶ (host ready) ──▶ on_ready ──▶ unload
//!                │                          │
//!                ├ settings                 ├ compose roles
//!                ├ servers                  └ enable features (staged)
//!                ├ features
//!                └ feature configs
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use banana_runtime::BananaRuntime;
//!
//! let runtime = BananaRuntime::builder()
//!     .config_root("/srv/scpsl/banana")
//!     .bus(host_bus)
//!     .store(host_groups)
//!     .host(StaticHost::new(7777))
//!     .build();
//!
//! runtime.register_plugin(&GREETINGS)?;
//! runtime.load()?;
//! runtime.run_until_ready().await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use banana_core::{
    ConversionRegistry, EventBus, HandlerId, HostEvent, HostInfo, LocalEventBus,
    MemoryPermissionStore, PermissionStore, ServerReady, Sleeper, StaticHost, TokioSleeper,
    typed_handler,
};
use banana_framework::{
    ActivationReport, BindingKey, BindingManager, EventBinding, FeatureDeclaration, FeatureManager,
    GroupPermissions, MetadataRegistry, PluginDescriptor, PluginModule, RoleCollection, RoleComposer, RoleLoadState,
    ServerProfile, ServerProfileCollection,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tracing::{debug, error, info, info_span, warn};

use crate::config::{ConfigLoader, ConfigRoot, LibrarySettings, load_feature_configs};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::{LoadedPlugin, PluginRegistry, RegistryStats};

/// Components built by [`BananaRuntime::load`].
#[derive(Clone)]
struct Session {
    binder: Arc<BindingManager>,
    features: FeatureManager,
    active: bool,
}

/// The ready-signal subscription.
#[derive(Default)]
struct ReadySignal {
    receiver: Option<oneshot::Receiver<()>>,
    handler: Arc<Mutex<Option<HandlerId>>>,
}

/// The Banana runtime.
pub struct BananaRuntime {
    root: ConfigRoot,
    settings: RwLock<LibrarySettings>,
    settings_pinned: bool,
    host: Arc<dyn HostInfo>,
    bus: Arc<dyn EventBus>,
    store: Arc<dyn PermissionStore>,
    sleeper: Arc<dyn Sleeper>,
    converters: Arc<ConversionRegistry>,
    modules: RwLock<Vec<PluginModule>>,
    metadata: MetadataRegistry,
    plugins: PluginRegistry,
    roles: Mutex<RoleComposer>,
    session: Mutex<Option<Session>>,
    ready: Mutex<ReadySignal>,
}

impl BananaRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a plugin by descriptor.
    pub fn register_plugin(&self, descriptor: &PluginDescriptor) -> RuntimeResult<()> {
        if !descriptor.is_compatible() {
            return Err(RuntimeError::Incompatible {
                plugin: descriptor.name.to_string(),
                api_version: descriptor.api_version,
            });
        }
        self.register_module(descriptor.instantiate())
    }

    /// Registers a plugin module. It is loaded by the next [`load`](Self::load).
    pub fn register_module(&self, module: PluginModule) -> RuntimeResult<()> {
        let mut modules = self.modules.write();
        if modules.iter().any(|m| m.name() == module.name()) {
            return Err(RuntimeError::PluginExists(module.name().to_string()));
        }
        info!(plugin = %module.name(), version = %module.version(), "Registered plugin");
        modules.push(module);
        Ok(())
    }

    /// Names of the registered plugins, in registration order.
    pub fn registered_plugins(&self) -> Vec<String> {
        self.modules.read().iter().map(|m| m.name().to_string()).collect()
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Loads every registered plugin and subscribes to the host's ready
    /// signal.
    ///
    /// Per plugin, in order: settings, servers, features, feature configs,
    /// then the `on_enabled` hook. A failure in one plugin never stops the
    /// others. Loading an already loaded runtime does nothing.
    pub fn load(&self) -> RuntimeResult<RegistryStats> {
        if self.session.lock().is_some() {
            warn!("Banana is already loaded");
            return Ok(self.plugins.stats());
        }

        let settings = self.settings.read().clone();
        if !settings.is_enabled {
            info!("Banana is disabled; no plugin will be loaded");
            return Ok(RegistryStats::default());
        }

        let metadata = self.metadata.register_event_metadata(&*self.bus);
        let binder = Arc::new(BindingManager::new(metadata, Arc::clone(&self.bus)));
        let features = FeatureManager::new(Arc::clone(&binder), Arc::clone(&self.converters))
            .with_delay(settings.activation_delay())
            .with_slow_threshold(settings.slow_activation());

        let modules = self.modules.read().clone();
        let index = self.metadata.find_descriptors(modules.iter());
        debug!(
            plugins = modules.len(),
            features = index.features.len(),
            roles = index.roles.len(),
            servers = index.servers.len(),
            "Discovered declarations"
        );

        for (position, module) in modules.iter().enumerate() {
            let servers: Vec<ServerProfile> = index.servers_of(position).copied().collect();
            let declarations: Vec<_> = index.features_of(position).collect();
            self.load_plugin(module, servers, declarations, &features, &settings);
        }

        *self.session.lock() = Some(Session {
            binder,
            features,
            active: false,
        });
        self.subscribe_ready();

        let stats = self.plugins.stats();
        info!(%stats, "Banana loaded");
        Ok(stats)
    }

    fn load_plugin(
        &self,
        module: &PluginModule,
        servers: Vec<ServerProfile>,
        declarations: Vec<&FeatureDeclaration>,
        features: &FeatureManager,
        library: &LibrarySettings,
    ) {
        let name = module.name();
        let plugin_settings = ConfigLoader::new()
            .without_env()
            .file(self.root.settings_file(name))
            .load_or_create(module.settings().clone());

        let span = info_span!(
            "plugin",
            plugin = %name,
            prefix = %plugin_settings.logger_prefix,
            debug = plugin_settings.debug
        );
        let _enter = span.enter();

        if !plugin_settings.is_enabled {
            info!("Plugin is disabled; skipping");
            return;
        }

        let configured_id = plugin_settings
            .server_id()
            .or_else(|| library.server_id())
            .unwrap_or_default();
        let (servers, server_error) =
            match ServerProfileCollection::resolve(servers.clone(), configured_id, self.host.server_port()) {
                Ok(collection) => (collection, None),
                Err(e) => {
                    warn!(error = %e, "Using global feature defaults");
                    (ServerProfileCollection::unresolved(servers), Some(e))
                }
            };

        let mut collection = features.discover(name, declarations, servers.primary());
        let outcome = load_feature_configs(
            &self.root.features_file(name),
            &mut collection,
            &self.converters,
        );
        debug!(features = collection.len(), rewritten = outcome.changed, "Feature configs loaded");

        let loaded = self.plugins.insert(LoadedPlugin {
            module: module.clone(),
            settings: plugin_settings,
            servers,
            server_error,
            features: Mutex::new(collection),
            config_dir: self.root.plugin_dir(name),
        });

        if let Some(hook) = loaded.module.on_enabled()
            && let Err(source) = hook()
        {
            let e = RuntimeError::Hook {
                plugin: name.to_string(),
                source,
            };
            error!(error = %e, "Plugin enable hook failed");
        }
        info!(
            version = %loaded.module.version(),
            features = loaded.features.lock().len(),
            "Plugin loaded"
        );
    }

    // =========================================================================
    // Ready signal
    // =========================================================================

    fn subscribe_ready(&self) {
        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        let slot: Arc<Mutex<Option<HandlerId>>> = Arc::default();

        let bus = Arc::clone(&self.bus);
        let handler_slot = Arc::clone(&slot);
        let handler = typed_handler(move |_: &ServerReady| {
            if let Some(sender) = sender.lock().take() {
                let _ = sender.send(());
            }
            if let Some(id) = handler_slot.lock().take() {
                bus.detach(&ServerReady::descriptor(), id);
                debug!("Ready handler detached");
            }
        });

        match self.bus.attach(&ServerReady::descriptor(), handler) {
            Ok(id) => {
                *slot.lock() = Some(id);
                debug!(event = %ServerReady::descriptor(), "Waiting for the ready signal");
            }
            Err(e) => warn!(error = %e, "Could not subscribe to the ready signal; call on_ready manually"),
        }

        *self.ready.lock() = ReadySignal {
            receiver: Some(receiver),
            handler: slot,
        };
    }

    fn unsubscribe_ready(&self) {
        let signal = std::mem::take(&mut *self.ready.lock());
        if let Some(id) = signal.handler.lock().take() {
            self.bus.detach(&ServerReady::descriptor(), id);
            debug!("Ready handler detached");
        }
    }

    /// Waits for the host's ready signal, then runs [`on_ready`](Self::on_ready).
    pub async fn run_until_ready(&self) -> RuntimeResult<ActivationReport> {
        let receiver = self.ready.lock().receiver.take().ok_or(RuntimeError::NotLoaded)?;
        receiver.await.map_err(|_| RuntimeError::ReadySignalLost)?;
        self.on_ready().await
    }

    /// Composes roles across every loaded plugin, then runs the first
    /// activation pass over their features.
    ///
    /// Only the first call activates; later calls return an empty report.
    pub async fn on_ready(&self) -> RuntimeResult<ActivationReport> {
        let session = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(RuntimeError::NotLoaded)?;
            if session.active {
                debug!("Features are already active");
                return Ok(ActivationReport::default());
            }
            session.active = true;
            session.clone()
        };
        self.unsubscribe_ready();

        let plugins = self.plugins.all();
        {
            let index = self.metadata.find_descriptors(plugins.iter().map(|p| &p.module));
            let mut roles = self.roles.lock();
            roles.compose(index.roles(), &*self.store);
        }

        let collections: Vec<_> = plugins.iter().map(|p| &p.features).collect();
        let report = session
            .features
            .enable_features(&collections, &*self.sleeper)
            .await;
        info!(
            enabled = report.enabled.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Features activated"
        );
        Ok(report)
    }

    // =========================================================================
    // Unload / reload
    // =========================================================================

    /// Disables every feature (last plugin first), unbinds every handler,
    /// drops the role set and runs the plugins' `on_disabled` hooks.
    ///
    /// Returns the number of features that were enabled.
    pub fn unload(&self) -> usize {
        let Some(session) = self.session.lock().take() else {
            debug!("Banana is not loaded");
            return 0;
        };
        self.unsubscribe_ready();

        let mut disabled = 0;
        for plugin in self.plugins.clear().iter().rev() {
            let span = info_span!("plugin", plugin = %plugin.name(), prefix = %plugin.logger_prefix());
            let _enter = span.enter();

            disabled += session.features.disable_all(&mut plugin.features.lock());
            if let Some(hook) = plugin.module.on_disabled()
                && let Err(source) = hook()
            {
                let e = RuntimeError::Hook {
                    plugin: plugin.name().to_string(),
                    source,
                };
                error!(error = %e, "Plugin disable hook failed");
            }
            debug!("Plugin unloaded");
        }

        let stray = session.binder.unbind_everything();
        if stray > 0 {
            debug!(bindings = stray, "Unbound remaining handlers");
        }
        self.roles.lock().unload();
        info!(disabled, "Banana unloaded");
        disabled
    }

    /// Unloads, re-reads `Banana.yml` and loads again.
    pub fn reload(&self) -> RuntimeResult<RegistryStats> {
        self.unload();
        if !self.settings_pinned {
            let settings = ConfigLoader::new()
                .file(self.root.library_file())
                .load_or_create(LibrarySettings::default());
            *self.settings.write() = settings;
        }
        self.load()
    }

    // =========================================================================
    // Manual control
    // =========================================================================

    fn session(&self) -> RuntimeResult<Session> {
        self.session.lock().clone().ok_or(RuntimeError::NotLoaded)
    }

    fn plugin(&self, name: &str) -> RuntimeResult<Arc<LoadedPlugin>> {
        self.plugins
            .get(name)
            .ok_or_else(|| RuntimeError::PluginNotFound(name.to_string()))
    }

    /// Switches one feature on or off, whatever its `should_enable`.
    pub fn set_feature_enabled(&self, plugin: &str, feature: &str, enabled: bool) -> RuntimeResult<()> {
        let session = self.session()?;
        let plugin = self.plugin(plugin)?;
        let mut features = plugin.features.lock();
        session.features.set_enabled(&mut features, feature, enabled)?;
        Ok(())
    }

    /// Binds every handler of a feature, manual ones included.
    pub fn load_feature_events(&self, plugin: &str, feature: &str) -> RuntimeResult<usize> {
        let session = self.session()?;
        let plugin = self.plugin(plugin)?;
        let features = plugin.features.lock();
        Ok(features.try_get(feature)?.load_events(&session.binder))
    }

    /// Unbinds every handler of a feature.
    pub fn unload_feature_events(&self, plugin: &str, feature: &str) -> RuntimeResult<usize> {
        let session = self.session()?;
        let plugin = self.plugin(plugin)?;
        let features = plugin.features.lock();
        Ok(features.try_get(feature)?.unload_events(&session.binder))
    }

    /// Binds handlers owned by no feature instance, manual ones included.
    pub fn load_static_events(
        &self,
        owner: &'static str,
        bindings: Vec<EventBinding>,
    ) -> RuntimeResult<Vec<BindingKey>> {
        Ok(self.session()?.binder.bind_all(owner, None, bindings))
    }

    /// Unbinds every static handler of `owner`.
    pub fn unload_static_events(&self, owner: &str) -> RuntimeResult<usize> {
        Ok(self.session()?.binder.unbind_owner(owner, None))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Library settings in effect.
    pub fn settings(&self) -> LibrarySettings {
        self.settings.read().clone()
    }

    /// The config root.
    pub fn config_root(&self) -> &ConfigRoot {
        &self.root
    }

    /// Loaded plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// The resolved roles.
    pub fn roles(&self) -> RoleCollection {
        self.roles.lock().roles().clone()
    }

    /// Group permissions derived from the roles.
    pub fn permissions(&self) -> GroupPermissions {
        self.roles.lock().permissions().clone()
    }

    /// Role composition state.
    pub fn role_state(&self) -> RoleLoadState {
        self.roles.lock().state()
    }

    /// Whether [`load`](Self::load) has run.
    pub fn is_loaded(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Whether the first activation pass has run.
    pub fn is_active(&self) -> bool {
        self.session.lock().as_ref().is_some_and(|s| s.active)
    }

    /// Returns statistics about the loaded plugins.
    pub fn stats(&self) -> RegistryStats {
        self.plugins.stats()
    }
}

impl std::fmt::Debug for BananaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BananaRuntime")
            .field("root", &self.root)
            .field("plugins", &self.registered_plugins())
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BananaRuntime`].
///
/// Every host seam has an in-process default: a [`LocalEventBus`], a
/// [`MemoryPermissionStore`], a host on port 7777 and the tokio timer.
pub struct RuntimeBuilder {
    root: Option<PathBuf>,
    settings: Option<LibrarySettings>,
    init_logging: bool,
    host: Option<Arc<dyn HostInfo>>,
    bus: Option<Arc<dyn EventBus>>,
    store: Option<Arc<dyn PermissionStore>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    converters: Option<ConversionRegistry>,
}

impl RuntimeBuilder {
    /// Creates a builder with every default.
    pub fn new() -> Self {
        Self {
            root: None,
            settings: None,
            init_logging: true,
            host: None,
            bus: None,
            store: None,
            sleeper: None,
            converters: None,
        }
    }

    /// Sets the config root (default: `<user config dir>/banana`).
    pub fn config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Uses `settings` instead of reading `Banana.yml`.
    pub fn settings(mut self, settings: LibrarySettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Skips installing the global log subscriber.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Sets the host facts.
    pub fn host(mut self, host: Arc<dyn HostInfo>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the host event bus.
    pub fn bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Sets the host permission-group store.
    pub fn store(mut self, store: Arc<dyn PermissionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the sleeper used between feature activations.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Sets the config value converters.
    pub fn converters(mut self, converters: ConversionRegistry) -> Self {
        self.converters = Some(converters);
        self
    }

    /// Builds the runtime, reading `Banana.yml` unless settings were given.
    pub fn build(self) -> BananaRuntime {
        let root = self.root.map_or_else(ConfigRoot::user_default, ConfigRoot::new);
        let settings_pinned = self.settings.is_some();
        let settings = self.settings.unwrap_or_else(|| {
            ConfigLoader::new()
                .file(root.library_file())
                .load_or_create(LibrarySettings::default())
        });

        if self.init_logging {
            logging::init_from_settings(&settings);
        }
        info!(
            root = %root.path().display(),
            enabled = settings.is_enabled,
            debug = settings.debug,
            "Runtime initialized from configuration"
        );

        BananaRuntime {
            root,
            settings: RwLock::new(settings),
            settings_pinned,
            host: self.host.unwrap_or_else(|| Arc::new(StaticHost::new(7777))),
            bus: self.bus.unwrap_or_else(|| Arc::new(LocalEventBus::new())),
            store: self.store.unwrap_or_else(|| Arc::new(MemoryPermissionStore::new())),
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
            converters: Arc::new(self.converters.unwrap_or_default()),
            modules: RwLock::new(Vec::new()),
            metadata: MetadataRegistry::new(),
            plugins: PluginRegistry::new(),
            roles: Mutex::new(RoleComposer::new()),
            session: Mutex::new(None),
            ready: Mutex::new(ReadySignal::default()),
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use banana_core::{NoDelay, PermissionFlags};
    use banana_framework::{
        BoxError, Configurable, Feature, InheritRole, PluginSettings, RoleDeclaration, ServerTarget,
    };
    use tracing_test::traced_test;

    struct Joined;

    impl HostEvent for Joined {
        const OWNER: &'static str = "Player";
        const NAME: &'static str = "Joined";
    }

    #[derive(Default)]
    struct Greeter {
        greeted: Arc<AtomicUsize>,
    }

    impl Configurable for Greeter {}

    impl Feature for Greeter {
        fn name(&self) -> &str {
            "Greeter"
        }

        fn enable(&mut self) -> Result<(), BoxError> {
            Ok(())
        }

        fn disable(&mut self) -> Result<(), BoxError> {
            Ok(())
        }

        fn event_bindings(&self) -> Vec<EventBinding> {
            let greeted = Arc::clone(&self.greeted);
            vec![EventBinding::on("on_joined", move |_: &Joined| {
                greeted.fetch_add(1, Ordering::SeqCst);
            })]
        }
    }

    #[derive(Default)]
    struct EventOnly;

    impl Configurable for EventOnly {}

    impl Feature for EventOnly {
        fn name(&self) -> &str {
            "EventOnly"
        }

        fn enable(&mut self) -> Result<(), BoxError> {
            Ok(())
        }

        fn disable(&mut self) -> Result<(), BoxError> {
            Ok(())
        }

        fn server_targets() -> Vec<ServerTarget> {
            vec![ServerTarget::disabled_by_default(), ServerTarget::enabled_on("Event")]
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        bus: Arc<LocalEventBus>,
        store: Arc<MemoryPermissionStore>,
        runtime: BananaRuntime,
    }

    fn harness(port: u16) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let bus = Arc::new(LocalEventBus::new());
        bus.expose::<Joined>();
        let store = Arc::new(MemoryPermissionStore::new());
        let runtime = BananaRuntime::builder()
            .config_root(dir.path())
            .without_logging()
            .host(Arc::new(StaticHost::new(port)))
            .bus(bus.clone())
            .store(store.clone())
            .sleeper(Arc::new(NoDelay::new()))
            .build();
        Harness {
            _dir: dir,
            bus,
            store,
            runtime,
        }
    }

    fn demo() -> PluginModule {
        PluginModule::builder("Demo")
            .logger_prefix("DM")
            .feature::<Greeter>()
            .feature::<EventOnly>()
            .role(RoleDeclaration::new("helper", 1).nodes(&["demo.helper"]).kick_power(3))
            .role(
                RoleDeclaration::new("moderator", 2)
                    .nodes(&["demo.moderator"])
                    .permissions(PermissionFlags::from_bits(0b10))
                    .inherits(&[InheritRole::Name("helper")]),
            )
            .server(ServerProfile::new("Main", "EU Main", "eu1", 7777))
            .server(ServerProfile::new("Event", "US Event", "us1", 8888))
            .build()
    }

    static DEMO: PluginDescriptor = PluginDescriptor::new("Demo", demo);

    #[tokio::test]
    async fn load_then_ready_enables_features_and_publishes_roles() {
        let h = harness(7777);
        h.runtime.register_plugin(&DEMO).unwrap();

        let stats = h.runtime.load().unwrap();
        assert_eq!(stats.plugins, 1);
        assert_eq!(stats.features, 2);
        assert!(h.runtime.config_root().settings_file("Demo").exists());
        let features_file = h.runtime.config_root().features_file("Demo");
        let written = fs::read_to_string(&features_file).unwrap();
        assert!(written.contains("greeter:"));
        assert!(written.contains("event_only:"));

        assert_eq!(h.bus.emit(&ServerReady), 1);
        assert_eq!(h.bus.handler_count(&ServerReady::descriptor()), 0);
        let report = h.runtime.run_until_ready().await.unwrap();

        assert_eq!(report.enabled, ["Greeter"]);
        assert_eq!(report.skipped, ["EventOnly"]);
        assert!(h.runtime.is_active());
        assert_eq!(h.bus.emit(&Joined), 1);

        let moderator = h.store.get("moderator").unwrap();
        assert_eq!(moderator.kick_power, 3);
        assert_eq!(moderator.permissions.bits(), 0b10);
        assert!(h.runtime.permissions().has_role("moderator", "helper"));
        assert_eq!(h.runtime.role_state(), RoleLoadState::Loaded);

        let again = h.runtime.on_ready().await.unwrap();
        assert!(again.enabled.is_empty());
    }

    #[tokio::test]
    async fn configured_server_id_beats_the_port() {
        let h = harness(7777);
        let settings = PluginSettings {
            current_banana_server_id: "us1".into(),
            ..Default::default()
        };
        crate::config::write_yaml(&h.runtime.config_root().settings_file("Demo"), &settings).unwrap();
        h.runtime.register_module(demo()).unwrap();

        h.runtime.load().unwrap();
        let report = h.runtime.on_ready().await.unwrap();

        let plugin = h.runtime.plugins().get("Demo").unwrap();
        assert_eq!(plugin.servers.primary().map(|s| s.id), Some("us1"));
        assert_eq!(plugin.settings.logger_prefix, "BP");
        assert_eq!(report.enabled, ["Greeter", "EventOnly"]);
    }

    #[test]
    #[traced_test]
    fn unmatched_servers_degrade_to_global_defaults() {
        let h = harness(9999);
        h.runtime.register_module(demo()).unwrap();

        h.runtime.load().unwrap();

        let plugin = h.runtime.plugins().get("Demo").unwrap();
        assert!(plugin.server_error.is_some());
        assert!(plugin.servers.primary().is_none());
        assert_eq!(plugin.servers.len(), 2);
        let features = plugin.features.lock();
        assert!(features.get("Greeter").unwrap().should_enable());
        assert!(!features.get("EventOnly").unwrap().should_enable());
        assert!(logs_contain("Using global feature defaults"));
    }

    #[test]
    fn disabled_plugins_and_library_load_nothing() {
        let h = harness(7777);
        let settings = PluginSettings {
            is_enabled: false,
            ..Default::default()
        };
        crate::config::write_yaml(&h.runtime.config_root().settings_file("Demo"), &settings).unwrap();
        h.runtime.register_module(demo()).unwrap();
        assert_eq!(h.runtime.load().unwrap().plugins, 0);

        let dir = tempfile::tempdir().unwrap();
        let runtime = BananaRuntime::builder()
            .config_root(dir.path())
            .without_logging()
            .settings(LibrarySettings {
                is_enabled: false,
                ..Default::default()
            })
            .build();
        runtime.register_module(demo()).unwrap();
        assert_eq!(runtime.load().unwrap(), RegistryStats::default());
        assert!(!runtime.is_loaded());
    }

    #[tokio::test]
    async fn unload_tears_everything_down_and_reload_restores() {
        let h = harness(7777);
        let disabled_hooks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disabled_hooks);
        h.runtime
            .register_module(
                PluginModule::builder("Hooks")
                    .feature::<Greeter>()
                    .on_disabled(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .build(),
            )
            .unwrap();
        h.runtime.load().unwrap();
        h.runtime.on_ready().await.unwrap();
        h.runtime
            .load_static_events("Greeting", vec![EventBinding::on("welcome", |_: &Joined| {}).manual()])
            .unwrap();
        assert_eq!(h.bus.handler_count(&Joined::descriptor()), 2);

        assert_eq!(h.runtime.unload(), 1);

        assert_eq!(h.bus.total_handlers(), 0);
        assert_eq!(disabled_hooks.load(Ordering::SeqCst), 1);
        assert!(h.runtime.plugins().is_empty());
        assert_eq!(h.runtime.role_state(), RoleLoadState::Unloaded);
        assert!(matches!(
            h.runtime.set_feature_enabled("Hooks", "Greeter", true),
            Err(RuntimeError::NotLoaded)
        ));

        h.runtime.reload().unwrap();
        assert_eq!(h.bus.handler_count(&ServerReady::descriptor()), 1);
        h.runtime.on_ready().await.unwrap();
        assert_eq!(h.runtime.stats().enabled, 1);
    }

    #[test]
    fn manual_toggles_and_event_loading() {
        let h = harness(7777);
        h.runtime.register_module(demo()).unwrap();
        h.runtime.load().unwrap();

        h.runtime.set_feature_enabled("Demo", "event_only", true).unwrap();
        assert_eq!(h.runtime.stats().enabled, 1);
        assert!(matches!(
            h.runtime.set_feature_enabled("Nope", "Greeter", true),
            Err(RuntimeError::PluginNotFound(_))
        ));

        assert_eq!(h.runtime.load_feature_events("Demo", "Greeter").unwrap(), 1);
        assert_eq!(h.bus.handler_count(&Joined::descriptor()), 1);
        assert_eq!(h.runtime.unload_feature_events("Demo", "Greeter").unwrap(), 1);
        assert_eq!(h.bus.handler_count(&Joined::descriptor()), 0);
    }

    #[test]
    fn duplicate_and_incompatible_registrations_fail() {
        let h = harness(7777);
        h.runtime.register_plugin(&DEMO).unwrap();
        assert!(matches!(
            h.runtime.register_module(demo()),
            Err(RuntimeError::PluginExists(_))
        ));

        let old = PluginDescriptor {
            api_version: 0,
            ..PluginDescriptor::new("Old", demo)
        };
        assert!(matches!(
            h.runtime.register_plugin(&old),
            Err(RuntimeError::Incompatible { .. })
        ));
        assert_eq!(h.runtime.registered_plugins(), ["Demo"]);
    }

    #[test]
    fn feature_configs_survive_a_reload() {
        let h = harness(7777);
        h.runtime.register_module(demo()).unwrap();
        h.runtime.load().unwrap();
        let path = h.runtime.config_root().features_file("Demo");
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("should_enable: false", "should_enable: true")).unwrap();

        h.runtime.reload().unwrap();

        let plugin = h.runtime.plugins().get("Demo").unwrap();
        assert!(plugin.features.lock().get("EventOnly").unwrap().should_enable());
    }
}
