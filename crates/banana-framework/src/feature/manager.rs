use std::sync::Arc;
use std::time::{Duration, Instant};

use banana_core::{ConversionRegistry, Sleeper};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::{FeatureCollection, FeatureDeclaration, FeatureInstance};
use crate::binding::BindingManager;
use crate::config::apply_server_defaults;
use crate::error::{FeatureError, FeatureResult};
use crate::server::{ServerProfile, resolve_default_enabled};

/// Pause before each feature of the first activation pass.
pub const DEFAULT_ACTIVATION_DELAY: Duration = Duration::from_millis(250);

/// Activation stages slower than this are reported.
pub const DEFAULT_SLOW_ACTIVATION: Duration = Duration::from_secs(1);

/// Outcome of an activation pass, by feature name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Features enabled (or already enabled).
    pub enabled: Vec<String>,
    /// Features left disabled by configuration.
    pub skipped: Vec<String>,
    /// Features whose activation failed.
    pub failed: Vec<String>,
}

impl ActivationReport {
    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: ActivationReport) {
        self.enabled.extend(other.enabled);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

/// Discovers features and drives their lifecycle.
#[derive(Debug, Clone)]
pub struct FeatureManager {
    binder: Arc<BindingManager>,
    converters: Arc<ConversionRegistry>,
    delay: Duration,
    slow_threshold: Duration,
}

impl FeatureManager {
    /// Creates a manager with the default pacing.
    pub fn new(binder: Arc<BindingManager>, converters: Arc<ConversionRegistry>) -> Self {
        Self {
            binder,
            converters,
            delay: DEFAULT_ACTIVATION_DELAY,
            slow_threshold: DEFAULT_SLOW_ACTIVATION,
        }
    }

    /// Sets the pause before each feature of an activation pass.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the slow-stage threshold.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// The binding manager used for transitions.
    pub fn binder(&self) -> &Arc<BindingManager> {
        &self.binder
    }

    /// The conversion registry used for config values.
    pub fn converters(&self) -> &Arc<ConversionRegistry> {
        &self.converters
    }

    /// Builds one instance per declaration.
    ///
    /// The default-enabled flag comes from the declaration's server targets
    /// under `primary`, and per-server config defaults are applied. A
    /// declaration whose factory fails is logged and skipped.
    pub fn discover<'a>(
        &self,
        plugin: &str,
        declarations: impl IntoIterator<Item = &'a FeatureDeclaration>,
        primary: Option<&ServerProfile>,
    ) -> FeatureCollection {
        let mut collection = FeatureCollection::new(plugin);
        for declaration in declarations {
            let feature = match declaration.construct() {
                Ok(feature) => feature,
                Err(e) => {
                    error!(plugin, error = %e, "Could not construct feature; skipping");
                    continue;
                }
            };
            let should_enable = resolve_default_enabled(declaration.server_targets(), primary);
            let mut instance = FeatureInstance::new(
                self.binder.allocate_instance(),
                declaration.type_name(),
                feature,
                should_enable,
            );
            apply_server_defaults(instance.feature_mut(), primary, &self.converters);
            debug!(plugin, feature = %instance.name(), should_enable, "Discovered feature");
            collection.push(instance);
        }
        collection
    }

    /// The first activation pass.
    ///
    /// Walks every collection in order. Before each feature it sleeps for
    /// the configured delay, whatever the outcome of the previous one. A
    /// feature is enabled when its `should_enable` is set; a failure is
    /// logged and the pass moves on.
    pub async fn enable_features(
        &self,
        collections: &[&Mutex<FeatureCollection>],
        sleeper: &dyn Sleeper,
    ) -> ActivationReport {
        let mut report = ActivationReport::default();
        for collection in collections {
            let (plugin, count) = {
                let guard = collection.lock();
                (guard.plugin().to_string(), guard.len())
            };
            debug!(plugin = %plugin, features = count, "Loading features");

            for index in 0..count {
                sleeper.sleep(self.delay).await;

                let mut guard = collection.lock();
                let Some(instance) = guard.get_index_mut(index) else {
                    break;
                };
                let name = instance.name().to_string();
                if !instance.should_enable() {
                    debug!(plugin = %plugin, feature = %name, "Feature will not be enabled due to configuration");
                    report.skipped.push(name);
                    continue;
                }

                let started = Instant::now();
                let result = instance.set_enabled(true, &self.binder);
                let elapsed = started.elapsed();
                drop(guard);

                if elapsed > self.slow_threshold {
                    warn!(
                        plugin = %plugin,
                        feature = %name,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Feature took long to enable"
                    );
                }
                match result {
                    Ok(()) => report.enabled.push(name),
                    Err(e) => {
                        warn!(plugin = %plugin, feature = %name, error = %e, "Could not load feature");
                        report.failed.push(name);
                    }
                }
            }
        }
        report
    }

    /// Switches one feature by name.
    pub fn set_enabled(
        &self,
        collection: &mut FeatureCollection,
        name: &str,
        enabled: bool,
    ) -> FeatureResult<()> {
        let instance = collection
            .get_mut(name)
            .ok_or_else(|| FeatureError::NotFound(name.to_string()))?;
        instance.set_enabled(enabled, &self.binder)
    }

    /// Disables every feature, last discovered first.
    ///
    /// Returns the number of features that were enabled.
    pub fn disable_all(&self, collection: &mut FeatureCollection) -> usize {
        let mut disabled = 0;
        for index in (0..collection.len()).rev() {
            let Some(instance) = collection.get_index_mut(index) else {
                continue;
            };
            if instance.is_enabled() {
                // disabling never returns an error
                let _ = instance.set_enabled(false, &self.binder);
                disabled += 1;
            }
        }
        disabled
    }
}
