use banana_core::{ConversionRegistry, Value, keys_match, to_snake_case};
use serde_yaml::Mapping;
use tracing::{debug, warn};

use super::{Feature, FeatureInstance};
use crate::error::{FeatureError, FeatureResult};

/// Result of [`FeatureCollection::hydrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct HydrateOutcome {
    /// The features document to persist, unknown sections included.
    pub document: Mapping,
    /// Whether `document` differs from what was read.
    pub changed: bool,
}

/// The features of one plugin, in discovery order.
#[derive(Debug, Default)]
pub struct FeatureCollection {
    plugin: String,
    features: Vec<FeatureInstance>,
}

impl FeatureCollection {
    /// Creates an empty collection for `plugin`.
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            features: Vec::new(),
        }
    }

    /// Owning plugin.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Appends an instance.
    pub fn push(&mut self, instance: FeatureInstance) {
        self.features.push(instance);
    }

    /// Looks a feature up by name, exact first, then snake_case-normalised.
    pub fn get(&self, name: &str) -> Option<&FeatureInstance> {
        self.position(name).map(|index| &self.features[index])
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FeatureInstance> {
        self.position(name).map(|index| &mut self.features[index])
    }

    /// Lookup by name that reports a missing feature as an error.
    pub fn try_get(&self, name: &str) -> FeatureResult<&FeatureInstance> {
        self.get(name)
            .ok_or_else(|| FeatureError::NotFound(name.to_string()))
    }

    /// The first feature of concrete type `F`.
    pub fn find<F: Feature>(&self) -> Option<&F> {
        self.features.iter().find_map(|f| f.downcast_ref::<F>())
    }

    /// Instance at `index` in discovery order.
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut FeatureInstance> {
        self.features.get_mut(index)
    }

    /// Iterates in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureInstance> {
        self.features.iter()
    }

    /// Iterates mutably in discovery order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FeatureInstance> {
        self.features.iter_mut()
    }

    /// Feature names in discovery order.
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(FeatureInstance::name).collect()
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the plugin has no feature.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Removes every instance, returning them in discovery order.
    pub fn drain(&mut self) -> Vec<FeatureInstance> {
        std::mem::take(&mut self.features)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.name() == name)
            .or_else(|| self.features.iter().position(|f| keys_match(f.name(), name)))
    }

    /// Applies a persisted features document and computes the document to
    /// write back.
    ///
    /// A feature's section is found by its exact name or its snake_case
    /// form. Missing sections and missing keys are filled from the live
    /// values; values that failed to apply are replaced by them. Sections of
    /// features that are not loaded are kept untouched.
    pub fn hydrate(&mut self, persisted: Option<&Mapping>, converters: &ConversionRegistry) -> HydrateOutcome {
        let mut document = persisted.cloned().unwrap_or_default();
        let mut changed = persisted.is_none();

        for instance in &mut self.features {
            let snake = to_snake_case(instance.name());
            let existing = document
                .iter()
                .find(|(key, _)| {
                    key.as_str()
                        .is_some_and(|key| key == instance.name() || key == snake)
                })
                .map(|(key, section)| (key.clone(), section.clone()));

            let (key, section) = match existing {
                Some((key, Value::Mapping(section))) => (key, section),
                Some((key, other)) => {
                    if !other.is_null() {
                        warn!(
                            plugin = %self.plugin,
                            feature = %instance.name(),
                            "Feature config is not a mapping; rewriting it"
                        );
                    }
                    document.insert(key, Value::Mapping(instance.config_section()));
                    changed = true;
                    continue;
                }
                None => {
                    debug!(plugin = %self.plugin, feature = %instance.name(), "Creating feature config");
                    document.insert(Value::String(snake), Value::Mapping(instance.config_section()));
                    changed = true;
                    continue;
                }
            };

            let report = instance.apply_config(&section, converters);
            let live = instance.config_section();
            let mut merged = section;
            for failed in &report.failed {
                let replacement = live
                    .iter()
                    .find(|(k, _)| k.as_str().is_some_and(|k| keys_match(k, failed)))
                    .map(|(_, v)| v.clone());
                if let Some(value) = replacement {
                    merged.insert(Value::String(failed.clone()), value);
                }
            }
            for (live_key, value) in live {
                let present = merged.keys().any(|k| {
                    k.as_str()
                        .zip(live_key.as_str())
                        .is_some_and(|(k, live)| keys_match(k, live))
                });
                if !present {
                    merged.insert(live_key, value);
                    changed = true;
                }
            }
            changed |= !report.failed.is_empty();
            document.insert(key, Value::Mapping(merged));
        }

        HydrateOutcome { document, changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testing::{Probe, binder};
    use crate::feature::{FeatureDeclaration, FeatureManager};

    fn collection(names: &[&'static str]) -> FeatureCollection {
        let (_, binder) = binder();
        let manager = FeatureManager::new(binder, Default::default());
        let declarations: Vec<_> = names
            .iter()
            .map(|&name| FeatureDeclaration::with_factory(move || Ok(Probe::named(name))))
            .collect();
        manager.discover("Demo", &declarations, None)
    }

    #[test]
    fn lookup_accepts_snake_case() {
        let features = collection(&["SomeFeature", "Other"]);
        assert!(features.get("SomeFeature").is_some());
        assert_eq!(features.get("some_feature").map(FeatureInstance::name), Some("SomeFeature"));
        assert!(matches!(features.try_get("missing"), Err(FeatureError::NotFound(_))));
        assert_eq!(features.names(), ["SomeFeature", "Other"]);
        assert!(features.find::<Probe>().is_some());
    }

    #[test]
    fn hydrate_applies_persisted_values() {
        let mut features = collection(&["SomeFeature"]);
        let persisted: Mapping =
            serde_yaml::from_str("some_feature:\n  cool_down_seconds: 5\nretired:\n  x: 1\n").unwrap();

        let outcome = features.hydrate(Some(&persisted), &ConversionRegistry::new());

        let probe = features.find::<Probe>().unwrap();
        assert_eq!(probe.cool_down_seconds, 5);
        assert!(outcome.changed);
        assert!(outcome.document.contains_key("retired"));
        let section = outcome.document.get("some_feature").unwrap();
        assert_eq!(section.get("should_enable"), Some(&Value::Bool(true)));
        assert_eq!(section.get("cool_down_seconds"), Some(&Value::from(5)));
    }

    #[test]
    fn hydrate_synthesizes_missing_document() {
        let mut features = collection(&["SomeFeature", "Other"]);
        let outcome = features.hydrate(None, &ConversionRegistry::new());
        assert!(outcome.changed);

        let keys: Vec<_> = outcome.document.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["some_feature", "other"]);

        let mut reloaded = collection(&["SomeFeature", "Other"]);
        let again = reloaded.hydrate(Some(&outcome.document), &ConversionRegistry::new());
        assert!(!again.changed);
        assert_eq!(again.document, outcome.document);
    }

    #[test]
    fn hydrate_replaces_bad_values() {
        let mut features = collection(&["SomeFeature"]);
        let persisted: Mapping = serde_yaml::from_str(
            "SomeFeature:\n  should_enable: false\n  cool_down_seconds: later\n",
        )
        .unwrap();

        let outcome = features.hydrate(Some(&persisted), &ConversionRegistry::new());

        assert!(outcome.changed);
        let section = outcome.document.get("SomeFeature").unwrap();
        assert_eq!(section.get("cool_down_seconds"), Some(&Value::from(10)));
        assert_eq!(section.get("should_enable"), Some(&Value::Bool(false)));
        assert!(!features.get("SomeFeature").unwrap().should_enable());
    }
}
