use std::fs;
use std::sync::Arc;

use banana::core::{
    ConfigType, ConversionRegistry, LocalEventBus, NoDelay, StaticHost, TypeTag, Value,
    registered_host_events,
};
use banana::framework::config::{apply_section, apply_server_defaults, snapshot};
use banana::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ConfigEnum)]
enum Difficulty {
    #[default]
    Normal,
    Hard,
    #[banana(rename = "Nightmare")]
    #[serde(rename = "Nightmare")]
    VeryHard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ConfigEnum)]
#[serde(rename_all = "snake_case")]
enum Badge {
    ArmyGreen,
    DeepPink,
}

#[derive(Debug, Default, BananaConfig)]
struct Cooldowns {
    /// Seconds between two uses.
    #[banana(config, default_for_server(kind = "Event", value = 2))]
    cool_down_seconds: i64,

    #[banana(key = "max_uses", default_for_server(id = "us1", value = 9))]
    uses: u32,

    #[banana(config)]
    difficulty: Difficulty,

    used: u32,
}

impl Feature for Cooldowns {
    fn name(&self) -> &str {
        "Cooldowns"
    }

    fn enable(&mut self) -> Result<(), BoxError> {
        Ok(())
    }

    fn disable(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[host_event(owner = "Player", name = "Joined")]
struct PlayerJoined;

#[host_event(owner = "Round")]
struct RoundStarted;

banana_server! {
    /// The main server.
    pub EU_MAIN { kind: "Main", name: "EU Main", id: "eu1", port: 7777 }
    US_EVENT { kind: "Event", id: "us1", port: 8888 }
    OLD { kind: "Main", id: "old", port: 7000, obsolete: true }
}

banana_role! {
    HELPER {
        name: "helper",
        hierarchy: 1,
        nodes: ["demo.helper"],
        kick_power: 3,
    }
    MODERATOR {
        name: "moderator",
        hierarchy: 2,
        nodes: ["demo.moderator"],
        permissions: 0b10,
        badge_color: Pumpkin,
        display_name: "Moderator",
        inherits: ["helper", type "AdminRole"],
        override_existing: true,
    }
}

#[test]
fn banana_config_builds_the_property_table() {
    let cooldowns = Cooldowns::default();
    let properties = cooldowns.config_properties();

    let keys: Vec<_> = properties.iter().map(|p| p.key).collect();
    assert_eq!(keys, ["cool_down_seconds", "max_uses", "difficulty"]);
    assert_eq!(properties[0].type_tag, TypeTag::Int);
    assert_eq!(properties[0].description, Some("Seconds between two uses."));
    assert_eq!(
        properties[0].server_defaults[0].target,
        ServerMatch::Kind("Event")
    );
    assert_eq!(properties[1].type_tag, TypeTag::UInt);
    assert_eq!(properties[1].server_defaults[0].target, ServerMatch::Id("us1"));
    assert!(properties[2].description.is_none());
}

#[test]
fn unmarked_fields_stay_invisible() {
    let mut cooldowns = Cooldowns::default();
    let section: serde_yaml::Mapping =
        serde_yaml::from_str("cool_down_seconds: '15'\nmax_uses: 4\nused: 99\ndifficulty: hard\n")
            .unwrap();

    let report = apply_section(&mut cooldowns, &section, &ConversionRegistry::new());

    assert_eq!(report.applied, ["cool_down_seconds", "max_uses", "difficulty"]);
    assert_eq!(report.ignored, ["used"]);
    assert_eq!(cooldowns.cool_down_seconds, 15);
    assert_eq!(cooldowns.uses, 4);
    assert_eq!(cooldowns.used, 0);
    assert_eq!(cooldowns.difficulty, Difficulty::Hard);

    let written = snapshot(&cooldowns);
    assert_eq!(written.len(), 3);
    assert_eq!(written.get("difficulty"), Some(&Value::from("Hard")));
}

#[test]
fn server_defaults_follow_the_primary_profile() {
    let mut cooldowns = Cooldowns::default();
    let applied = apply_server_defaults(&mut cooldowns, Some(&US_EVENT), &ConversionRegistry::new());

    assert_eq!(applied, 2);
    assert_eq!(cooldowns.cool_down_seconds, 2);
    assert_eq!(cooldowns.uses, 9);

    let mut main = Cooldowns::default();
    assert_eq!(
        apply_server_defaults(&mut main, Some(&EU_MAIN), &ConversionRegistry::new()),
        0
    );
}

#[test]
fn config_enum_matches_by_name_or_index() {
    let TypeTag::Enum { name, variants } = Difficulty::type_tag() else {
        panic!("expected an enum tag");
    };
    assert_eq!(name, "Difficulty");
    assert_eq!(variants, ["Normal", "Hard", "Nightmare"]);

    let converters = ConversionRegistry::new();
    let tag = Difficulty::type_tag();
    assert_eq!(
        converters.convert(&tag, &Value::from("nightmare")).unwrap(),
        Value::from("Nightmare")
    );
    assert_eq!(
        converters.convert(&tag, &Value::from(1)).unwrap(),
        Value::from("Hard")
    );
}

#[test]
fn config_enum_follows_serde_rename_all() {
    let tag = Badge::type_tag();
    let converted = ConversionRegistry::new()
        .convert(&tag, &Value::from("ARMY_GREEN"))
        .unwrap();
    assert_eq!(converted, Value::from("army_green"));

    let badge: Badge = serde_yaml::from_value(converted).unwrap();
    assert_eq!(badge, Badge::ArmyGreen);
}

#[test]
fn host_events_are_registered() {
    assert_eq!(PlayerJoined::OWNER, "Player");
    assert_eq!(PlayerJoined::NAME, "Joined");
    assert_eq!(RoundStarted::NAME, "RoundStarted");

    let registered: Vec<_> = registered_host_events().collect();
    assert!(registered.contains(&PlayerJoined::descriptor()));
    assert!(registered.contains(&RoundStarted::descriptor()));
    assert!(registered.contains(&ServerReady::descriptor()));
}

#[test]
fn declaration_macros_emit_statics() {
    assert_eq!(EU_MAIN.name, "EU Main");
    assert_eq!(US_EVENT.name, "Event");
    assert_eq!(US_EVENT.port, 8888);
    assert!(OLD.obsolete);
    assert!(!EU_MAIN.obsolete);

    assert_eq!(HELPER.kick_power, Some(3));
    assert_eq!(MODERATOR.hierarchy, 2);
    assert_eq!(MODERATOR.permissions.bits(), 0b10);
    assert_eq!(MODERATOR.badge_color, Some(RoleColor::Pumpkin));
    assert_eq!(MODERATOR.display_name, Some("Moderator"));
    assert_eq!(
        MODERATOR.inherits,
        [InheritRole::Name("helper"), InheritRole::Type("AdminRole")]
    );
    assert!(MODERATOR.override_existing);
}

fn plugin() -> PluginModule {
    PluginModule::builder("Demo")
        .feature::<Cooldowns>()
        .role(HELPER)
        .role(MODERATOR)
        .server(EU_MAIN)
        .server(US_EVENT)
        .server(OLD)
        .build()
}

static DEMO: PluginDescriptor = PluginDescriptor::new("Demo", plugin);

#[tokio::test]
async fn runtime_loads_a_macro_declared_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let bus = Arc::new(LocalEventBus::new());
    let runtime = BananaRuntime::builder()
        .config_root(dir.path())
        .without_logging()
        .host(Arc::new(StaticHost::new(8888)))
        .bus(bus.clone())
        .sleeper(Arc::new(NoDelay::new()))
        .build();
    runtime.register_plugin(&DEMO).unwrap();

    let stats = runtime.load().unwrap();
    assert_eq!(stats.features, 1);

    let features = fs::read_to_string(runtime.config_root().features_file("Demo")).unwrap();
    assert!(features.contains("cooldowns:"));
    assert!(features.contains("cool_down_seconds: 2"));
    assert!(features.contains("max_uses: 9"));
    assert!(!features.contains("used:"));

    assert_eq!(bus.emit(&ServerReady), 1);
    let report = runtime.run_until_ready().await.unwrap();
    assert_eq!(report.enabled, ["Cooldowns"]);

    let roles = runtime.roles();
    let moderator = roles.get("moderator").unwrap();
    assert_eq!(moderator.kick_power, 3);
    assert!(runtime.permissions().has_role("moderator", "helper"));
}
