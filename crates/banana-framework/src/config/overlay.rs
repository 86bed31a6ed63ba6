use banana_core::{ConversionRegistry, ConvertError, ConvertResult, Value, keys_match};
use serde_yaml::Mapping;
use tracing::{debug, warn};

use super::{ConfigProperty, Configurable};
use crate::server::ServerProfile;

/// Result of a single [`apply_patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The property under this key was assigned.
    Applied(&'static str),
    /// No configurable property matches the key.
    Ignored,
}

/// Per-key results of [`apply_section`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionReport {
    /// Keys of assigned properties.
    pub applied: Vec<&'static str>,
    /// Persisted keys with no configurable property.
    pub ignored: Vec<String>,
    /// Keys whose value could not be converted or assigned.
    pub failed: Vec<String>,
}

impl SectionReport {
    /// Returns `true` if every persisted key was applied.
    pub fn is_clean(&self) -> bool {
        self.ignored.is_empty() && self.failed.is_empty()
    }
}

/// Effective default of `property` under `primary`.
///
/// Walks the declared per-server defaults in order and returns the first one
/// matching the primary profile's type or id; otherwise `compiled`.
pub fn resolve_default(
    property: &ConfigProperty,
    compiled: Value,
    primary: Option<&ServerProfile>,
) -> Value {
    let Some(profile) = primary else {
        return compiled;
    };
    property
        .server_defaults
        .iter()
        .find(|default| default.target.matches(profile))
        .map_or(compiled, |default| default.value.clone())
}

/// Overwrites every property that has a per-server default for `primary`.
///
/// Returns the number of properties assigned. A default that fails to
/// convert is logged and leaves the compiled value in place.
pub fn apply_server_defaults<C>(
    target: &mut C,
    primary: Option<&ServerProfile>,
    converters: &ConversionRegistry,
) -> usize
where
    C: Configurable + ?Sized,
{
    let Some(profile) = primary else {
        return 0;
    };
    let mut applied = 0;
    for property in target.config_properties() {
        let Some(default) = property
            .server_defaults
            .iter()
            .find(|default| default.target.matches(profile))
        else {
            continue;
        };
        match assign(target, &property, &default.value, converters) {
            Ok(()) => applied += 1,
            Err(e) => warn!(
                key = property.key,
                server = profile.id,
                error = %e,
                "Invalid per-server default; keeping compiled value"
            ),
        }
    }
    applied
}

/// Assigns `raw` to the configurable property whose key matches `key`.
///
/// Keys are compared after snake_case normalisation. Fields that are not
/// configurable are never targeted. A conversion failure is logged and
/// leaves the property unchanged.
pub fn apply_patch<C>(
    target: &mut C,
    key: &str,
    raw: &Value,
    converters: &ConversionRegistry,
) -> ConvertResult<PatchOutcome>
where
    C: Configurable + ?Sized,
{
    let properties = target.config_properties();
    let Some(property) = properties.iter().find(|p| keys_match(p.key, key)) else {
        debug!(key, "Not a configurable property; ignored");
        return Ok(PatchOutcome::Ignored);
    };

    assign(target, property, raw, converters)
        .map(|()| PatchOutcome::Applied(property.key))
        .inspect_err(|e| {
            warn!(key = property.key, ty = %property.type_tag, error = %e, "Could not apply config value")
        })
}

/// Applies every entry of a persisted section.
///
/// Entries are independent: a failing key does not stop the others.
pub fn apply_section<'a, C, I>(target: &mut C, entries: I, converters: &ConversionRegistry) -> SectionReport
where
    C: Configurable + ?Sized,
    I: IntoIterator<Item = (&'a Value, &'a Value)>,
{
    let mut report = SectionReport::default();
    for (key, raw) in entries {
        let Some(key) = key.as_str() else {
            debug!(?key, "Non-string config key; ignored");
            continue;
        };
        match apply_patch(target, key, raw, converters) {
            Ok(PatchOutcome::Applied(key)) => report.applied.push(key),
            Ok(PatchOutcome::Ignored) => report.ignored.push(key.to_string()),
            Err(_) => report.failed.push(key.to_string()),
        }
    }
    report
}

/// Current values of every configurable property, keyed by property key.
pub fn snapshot<C>(target: &C) -> Mapping
where
    C: Configurable + ?Sized,
{
    let mut section = Mapping::new();
    for property in target.config_properties() {
        if let Some(value) = target.read_property(property.key) {
            section.insert(Value::String(property.key.to_string()), value);
        }
    }
    section
}

fn assign<C>(
    target: &mut C,
    property: &ConfigProperty,
    raw: &Value,
    converters: &ConversionRegistry,
) -> ConvertResult<()>
where
    C: Configurable + ?Sized,
{
    if !converters.supports(&property.type_tag) {
        return Err(ConvertError::Unsupported(property.type_tag.to_string()));
    }
    let value = converters.convert(&property.type_tag, raw)?;
    target.write_property(property.key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerMatch;
    use banana_core::{ConfigType, RoleColor, TypeTag};

    #[derive(Debug)]
    struct Cooldowns {
        cool_down_seconds: i64,
        badge: RoleColor,
        uses: i64,
        weights: Vec<u32>,
    }

    impl Default for Cooldowns {
        fn default() -> Self {
            Self {
                cool_down_seconds: 10,
                badge: RoleColor::White,
                uses: 10,
                weights: vec![1],
            }
        }
    }

    impl Configurable for Cooldowns {
        fn config_properties(&self) -> Vec<ConfigProperty> {
            vec![
                ConfigProperty::new("cool_down_seconds", i64::type_tag())
                    .describe("Seconds between two uses.")
                    .server_default(ServerMatch::Id("ev1"), 30)
                    .server_default(ServerMatch::Kind("Event"), 2),
                ConfigProperty::new("badge", RoleColor::type_tag()),
                ConfigProperty::new("weights", Vec::<u32>::type_tag()),
            ]
        }

        fn read_property(&self, key: &str) -> Option<Value> {
            match key {
                "cool_down_seconds" => serde_yaml::to_value(self.cool_down_seconds).ok(),
                "badge" => serde_yaml::to_value(self.badge).ok(),
                "weights" => serde_yaml::to_value(&self.weights).ok(),
                _ => None,
            }
        }

        fn write_property(&mut self, key: &str, value: Value) -> ConvertResult<()> {
            match key {
                "cool_down_seconds" => self.cool_down_seconds = serde_yaml::from_value(value)?,
                "badge" => self.badge = serde_yaml::from_value(value)?,
                "weights" => self.weights = serde_yaml::from_value(value)?,
                other => return Err(ConvertError::UnknownProperty(other.to_string())),
            }
            Ok(())
        }
    }

    const EVENT_1: ServerProfile = ServerProfile::new("Event", "Event 1", "ev1", 1);
    const EVENT_2: ServerProfile = ServerProfile::new("Event", "Event 2", "ev2", 2);

    fn section(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn persisted_value_overrides_only_configurable_fields() {
        let mut feature = Cooldowns::default();
        let persisted = section("cool_down_seconds: 5\nuses: 99\n");
        let report = apply_section(&mut feature, &persisted, &ConversionRegistry::new());

        assert_eq!(feature.cool_down_seconds, 5);
        assert_eq!(feature.uses, 10);
        assert_eq!(report.applied, vec!["cool_down_seconds"]);
        assert_eq!(report.ignored, vec!["uses".to_string()]);
    }

    #[test]
    fn keys_are_normalised() {
        let mut feature = Cooldowns::default();
        let outcome = apply_patch(
            &mut feature,
            "CoolDownSeconds",
            &Value::String("7".into()),
            &ConversionRegistry::new(),
        )
        .unwrap();
        assert_eq!(outcome, PatchOutcome::Applied("cool_down_seconds"));
        assert_eq!(feature.cool_down_seconds, 7);
    }

    #[test]
    fn enum_and_list_values_convert() {
        let mut feature = Cooldowns::default();
        let persisted = section("badge: Army_Green\nweights: ['3', 4]\n");
        let report = apply_section(&mut feature, &persisted, &ConversionRegistry::new());

        assert!(report.is_clean());
        assert_eq!(feature.badge, RoleColor::ArmyGreen);
        assert_eq!(feature.weights, vec![3, 4]);
    }

    #[test]
    fn bad_values_leave_the_property_unchanged() {
        let mut feature = Cooldowns::default();
        let persisted = section("cool_down_seconds: soon\nbadge: plaid\nweights: [5]\n");
        let report = apply_section(&mut feature, &persisted, &ConversionRegistry::new());

        assert_eq!(feature.cool_down_seconds, 10);
        assert_eq!(feature.badge, RoleColor::White);
        assert_eq!(feature.weights, vec![5]);
        assert_eq!(report.failed.len(), 2);
    }

    #[test]
    fn unsupported_types_fail_without_assigning() {
        let mut feature = Cooldowns::default();
        let outcome = apply_patch(
            &mut feature,
            "weights",
            &Value::Sequence(vec![Value::from(1)]),
            &ConversionRegistry::empty(),
        );
        assert!(matches!(outcome, Err(ConvertError::Unsupported(_))));
        assert_eq!(feature.weights, vec![1]);
    }

    #[test]
    fn first_matching_server_default_wins() {
        let feature = Cooldowns::default();
        let property = &feature.config_properties()[0];
        assert_eq!(
            resolve_default(property, Value::from(10), Some(&EVENT_1)),
            Value::from(30)
        );
        assert_eq!(
            resolve_default(property, Value::from(10), Some(&EVENT_2)),
            Value::from(2)
        );
        assert_eq!(resolve_default(property, Value::from(10), None), Value::from(10));

        let mut feature = Cooldowns::default();
        let applied = apply_server_defaults(&mut feature, Some(&EVENT_2), &ConversionRegistry::new());
        assert_eq!(applied, 1);
        assert_eq!(feature.cool_down_seconds, 2);
    }

    #[test]
    fn snapshot_lists_configurable_fields_in_order() {
        let feature = Cooldowns::default();
        let keys: Vec<_> = snapshot(&feature)
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        assert_eq!(keys, ["cool_down_seconds", "badge", "weights"]);
        assert_eq!(i64::type_tag(), TypeTag::Int);
    }
}
