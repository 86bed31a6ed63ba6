use banana_core::{ConversionRegistry, TypeTag, Value};
use serde_yaml::Mapping;
use tracing::{error, info, warn};

use super::Feature;
use crate::binding::{BindingKey, BindingManager, InstanceId};
use crate::config::{SectionReport, apply_section, snapshot};
use crate::error::{FeatureError, FeatureResult};

/// Key of the persisted `should_enable` flag in a feature section.
pub const SHOULD_ENABLE_KEY: &str = "should_enable";

/// A live feature and its lifecycle state.
pub struct FeatureInstance {
    id: InstanceId,
    type_name: &'static str,
    name: String,
    feature: Box<dyn Feature>,
    should_enable: bool,
    enabled: bool,
    subscriptions: Vec<BindingKey>,
}

impl FeatureInstance {
    /// Wraps a freshly constructed feature. Instances start disabled.
    pub fn new(
        id: InstanceId,
        type_name: &'static str,
        feature: Box<dyn Feature>,
        should_enable: bool,
    ) -> Self {
        Self {
            id,
            type_name,
            name: feature.name().to_string(),
            feature,
            should_enable,
            enabled: false,
            subscriptions: Vec::new(),
        }
    }

    /// Binding owner id.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the feature is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the first activation pass enables this feature.
    pub fn should_enable(&self) -> bool {
        self.should_enable
    }

    /// Overrides the first-pass decision.
    pub fn set_should_enable(&mut self, should_enable: bool) {
        self.should_enable = should_enable;
    }

    /// Bindings made by the last enable.
    pub fn subscriptions(&self) -> &[BindingKey] {
        &self.subscriptions
    }

    /// The feature.
    pub fn feature(&self) -> &dyn Feature {
        &*self.feature
    }

    /// The feature, mutably.
    pub fn feature_mut(&mut self) -> &mut dyn Feature {
        &mut *self.feature
    }

    /// The feature as its concrete type.
    pub fn downcast_ref<F: Feature>(&self) -> Option<&F> {
        self.feature().as_any().downcast_ref()
    }

    /// The feature as its concrete type, mutably.
    pub fn downcast_mut<F: Feature>(&mut self) -> Option<&mut F> {
        self.feature_mut().as_any_mut().downcast_mut()
    }

    /// Switches the feature on or off.
    ///
    /// Setting the current value does nothing. Enabling binds handlers and
    /// then runs the activation hook; if the hook fails the bindings are
    /// rolled back, the failure is logged and returned. Disabling unbinds
    /// and then runs the deactivation hook; a failure there is logged only.
    pub fn set_enabled(&mut self, enabled: bool, binder: &BindingManager) -> FeatureResult<()> {
        if enabled == self.enabled {
            return Ok(());
        }
        if enabled {
            self.enable(binder)
        } else {
            self.disable(binder);
            Ok(())
        }
    }

    fn enable(&mut self, binder: &BindingManager) -> FeatureResult<()> {
        let keys = binder.bind(self.type_name, Some(self.id), self.feature.event_bindings());
        match self.feature.enable() {
            Ok(()) => {
                self.subscriptions = keys;
                self.enabled = true;
                info!(feature = %self.name, bindings = self.subscriptions.len(), "Feature was enabled");
                Ok(())
            }
            Err(source) => {
                for key in &keys {
                    binder.unbind(key);
                }
                error!(feature = %self.name, error = %source, "Feature could not be enabled");
                Err(FeatureError::activation(&self.name, source))
            }
        }
    }

    fn disable(&mut self, binder: &BindingManager) {
        self.subscriptions.clear();
        binder.unbind_owner(self.type_name, Some(self.id));
        self.enabled = false;
        if let Err(e) = self.feature.disable() {
            error!(feature = %self.name, error = %e, "Feature did not shut down cleanly");
        }
        info!(feature = %self.name, "Feature was disabled");
    }

    /// Binds every handler of the feature, including manual ones.
    pub fn load_events(&self, binder: &BindingManager) -> usize {
        binder
            .bind_all(self.type_name, Some(self.id), self.feature.event_bindings())
            .len()
    }

    /// Unbinds every handler of the feature.
    pub fn unload_events(&self, binder: &BindingManager) -> usize {
        binder.unbind_owner(self.type_name, Some(self.id))
    }

    /// Applies a persisted config section.
    ///
    /// `should_enable` is taken from the section when present; the remaining
    /// keys go through the config overlay.
    pub fn apply_config(&mut self, section: &Mapping, converters: &ConversionRegistry) -> SectionReport {
        let mut report = SectionReport::default();
        if let Some(raw) = section.get(SHOULD_ENABLE_KEY) {
            match converters.convert(&TypeTag::Bool, raw) {
                Ok(Value::Bool(flag)) => self.should_enable = flag,
                _ => {
                    warn!(feature = %self.name, value = ?raw, "Invalid should_enable; keeping default");
                    report.failed.push(SHOULD_ENABLE_KEY.to_string());
                }
            }
        }

        let entries = section
            .iter()
            .filter(|(key, _)| key.as_str() != Some(SHOULD_ENABLE_KEY));
        let overlay = apply_section(&mut *self.feature, entries, converters);
        report.applied.extend(overlay.applied);
        report.ignored.extend(overlay.ignored);
        report.failed.extend(overlay.failed);

        self.feature.config_loaded();
        report
    }

    /// The section persisted for this feature: `should_enable` followed by
    /// every configurable property.
    pub fn config_section(&self) -> Mapping {
        let mut section = Mapping::new();
        section.insert(
            Value::String(SHOULD_ENABLE_KEY.to_string()),
            Value::Bool(self.should_enable),
        );
        section.extend(snapshot(&*self.feature));
        section
    }
}

impl std::fmt::Debug for FeatureInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureInstance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("should_enable", &self.should_enable)
            .field("enabled", &self.enabled)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
