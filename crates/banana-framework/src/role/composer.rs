use std::collections::HashMap;

use banana_core::{PermissionFlags, PermissionStore, RoleColor};
use tracing::{debug, info, warn};

use super::{
    GroupPermissions, InheritRole, ResolvedRole, RoleCollection, RoleDeclaration, RoleOverrides,
};

/// Progress of a composition pass.
///
/// ```text
///  Unloaded ──▶ Discovering ──▶ Inheriting ──▶ Merging ──▶ Publishing ──▶ Loaded
///     ▲                                                                     │
///     └──────────────────────────── unload ─────────────────────────────────┘
/// ```
///
/// Composing again from `Loaded` restarts at `Discovering`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleLoadState {
    /// No role is loaded.
    #[default]
    Unloaded,
    /// Declarations are being keyed by name.
    Discovering,
    /// Inheritance references are being resolved.
    Inheriting,
    /// Inherited attributes are being merged.
    Merging,
    /// Groups are being written to the permission store.
    Publishing,
    /// Roles are resolved and published.
    Loaded,
}

/// Builds the role set from declarations and publishes it.
#[derive(Debug, Default)]
pub struct RoleComposer {
    state: RoleLoadState,
    roles: RoleCollection,
    permissions: GroupPermissions,
}

/// A role while its inheritance is merged.
struct Working {
    declaration: RoleDeclaration,
    nodes: Vec<String>,
    flags: PermissionFlags,
    kick_power: Option<u8>,
    required_kick_power: Option<u8>,
    badge_color: Option<RoleColor>,
    cover: Option<bool>,
    auto_hide: Option<bool>,
    parents: Vec<usize>,
}

impl Working {
    fn new(declaration: RoleDeclaration) -> Self {
        let mut nodes: Vec<String> = Vec::with_capacity(declaration.permission_nodes.len());
        for node in declaration.permission_nodes {
            if !nodes.iter().any(|n| n == node) {
                nodes.push((*node).to_string());
            }
        }
        Self {
            nodes,
            flags: declaration.permissions,
            kick_power: declaration.kick_power,
            required_kick_power: declaration.required_kick_power,
            badge_color: declaration.badge_color,
            cover: declaration.cover,
            auto_hide: declaration.auto_hide,
            parents: Vec::new(),
            declaration,
        }
    }
}

impl RoleComposer {
    /// Creates a composer with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> RoleLoadState {
        self.state
    }

    /// The resolved roles.
    pub fn roles(&self) -> &RoleCollection {
        &self.roles
    }

    /// Group permissions derived from the resolved roles.
    pub fn permissions(&self) -> &GroupPermissions {
        &self.permissions
    }

    /// Runs a full composition pass and publishes the result to `store`.
    ///
    /// Any previously loaded role set is replaced wholesale.
    pub fn compose<'a>(
        &mut self,
        declarations: impl IntoIterator<Item = &'a RoleDeclaration>,
        store: &dyn PermissionStore,
    ) -> &RoleCollection {
        if self.state == RoleLoadState::Loaded {
            debug!(roles = self.roles.len(), "Recomposing roles");
        }

        self.state = RoleLoadState::Discovering;
        let mut working = discover(declarations);

        self.state = RoleLoadState::Inheriting;
        resolve_inheritance(&mut working);

        self.state = RoleLoadState::Merging;
        let order = merge_order(&working);
        merge(&mut working, &order);
        let mut resolved: Vec<ResolvedRole> = order.iter().map(|&i| resolve(&working, i)).collect();

        self.state = RoleLoadState::Publishing;
        publish(&mut resolved, store);

        self.roles = RoleCollection::from_roles(resolved);
        self.permissions = GroupPermissions::from_roles(&self.roles);
        self.state = RoleLoadState::Loaded;
        info!(roles = self.roles.len(), "Roles loaded");
        &self.roles
    }

    /// Drops the resolved roles. Published groups stay in the store.
    pub fn unload(&mut self) {
        self.roles = RoleCollection::default();
        self.permissions = GroupPermissions::default();
        self.state = RoleLoadState::Unloaded;
        debug!("Roles unloaded");
    }
}

// ─── Stages ───────────────────────────────────────────────────────────────────

fn discover<'a>(declarations: impl IntoIterator<Item = &'a RoleDeclaration>) -> Vec<Working> {
    let mut roles: Vec<Working> = Vec::new();
    let mut by_name: HashMap<&'static str, usize> = HashMap::new();
    for declaration in declarations {
        match by_name.get(declaration.name) {
            Some(&index) => {
                warn!(
                    role = declaration.name,
                    replaced = roles[index].declaration.type_name,
                    by = declaration.type_name,
                    "Duplicate role name; the last declaration wins"
                );
                roles[index] = Working::new(*declaration);
            }
            None => {
                by_name.insert(declaration.name, roles.len());
                roles.push(Working::new(*declaration));
            }
        }
    }
    roles
}

fn resolve_inheritance(roles: &mut [Working]) {
    for index in 0..roles.len() {
        let mut parents = Vec::new();
        for reference in roles[index].declaration.inherits {
            let target = reference.target();
            let found = match reference {
                InheritRole::Name(name) => roles.iter().position(|r| r.declaration.name == *name),
                InheritRole::Type(name) => roles.iter().position(|r| r.declaration.type_name == *name),
            };
            match found {
                Some(parent) if parent != index && !parents.contains(&parent) => parents.push(parent),
                Some(_) => {}
                None => debug!(
                    role = roles[index].declaration.name,
                    inherits = target,
                    "Inherited role not found; ignoring"
                ),
            }
        }
        roles[index].parents = parents;
    }
}

/// Indices sorted by ascending hierarchy; ties keep discovery order.
fn merge_order(roles: &[Working]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..roles.len()).collect();
    order.sort_by_key(|&i| roles[i].declaration.hierarchy);
    order
}

fn merge(roles: &mut [Working], order: &[usize]) {
    for &index in order {
        for parent in roles[index].parents.clone() {
            let inherited = &roles[parent];
            let nodes = inherited.nodes.clone();
            let flags = inherited.flags;
            let kick_power = inherited.kick_power;
            let required_kick_power = inherited.required_kick_power;
            let badge_color = inherited.badge_color;
            let cover = inherited.cover;
            let auto_hide = inherited.auto_hide;

            let role = &mut roles[index];
            role.kick_power = max_known(role.kick_power, kick_power);
            role.required_kick_power = max_known(role.required_kick_power, required_kick_power);
            role.flags.include(flags);
            for node in nodes {
                if !role.nodes.contains(&node) {
                    role.nodes.push(node);
                }
            }
            role.badge_color = role.badge_color.or(badge_color);
            role.cover = role.cover.or(cover);
            role.auto_hide = role.auto_hide.or(auto_hide);
        }
    }
}

fn max_known(a: Option<u8>, b: Option<u8>) -> Option<u8> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn resolve(roles: &[Working], index: usize) -> ResolvedRole {
    let role = &roles[index];
    let declaration = &role.declaration;
    ResolvedRole {
        type_name: declaration.type_name,
        name: declaration.name.to_string(),
        hierarchy: declaration.hierarchy,
        override_existing: declaration.override_existing,
        permission_nodes: role.nodes.clone(),
        permissions: role.flags,
        kick_power: role.kick_power.unwrap_or(0),
        required_kick_power: role.required_kick_power.unwrap_or(0),
        display_name: declaration.display_name.unwrap_or(declaration.name).to_string(),
        badge_color: role.badge_color.unwrap_or_default(),
        cover: role.cover.unwrap_or(true),
        auto_hide: role.auto_hide.unwrap_or(false),
        inherits: role
            .parents
            .iter()
            .map(|&p| roles[p].declaration.name.to_string())
            .collect(),
        overrides: RoleOverrides {
            kick_power: role.kick_power,
            required_kick_power: role.required_kick_power,
            display_name: declaration.display_name.map(str::to_string),
            badge_color: role.badge_color,
            cover: role.cover,
            auto_hide: role.auto_hide,
        },
        primary_node: declaration.permission_nodes.first().map(|n| (*n).to_string()),
        group: None,
    }
}

/// Writes every role to the store without yielding.
fn publish(roles: &mut [ResolvedRole], store: &dyn PermissionStore) {
    for role in roles {
        let (mut group, created) = store.fetch_or_create(&role.name);
        if created {
            group = role.to_group();
            debug!(role = %role.name, "Creating permission group");
        } else {
            role.merge_into(&mut group);
            debug!(role = %role.name, "Merging into existing permission group");
        }
        store.put(group);
        role.group = Some(role.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::InheritRole;
    use banana_core::MemoryPermissionStore;
    use tracing_test::traced_test;

    fn compose(declarations: &[RoleDeclaration]) -> (RoleComposer, MemoryPermissionStore) {
        let store = MemoryPermissionStore::new();
        let mut composer = RoleComposer::new();
        composer.compose(declarations, &store);
        (composer, store)
    }

    #[test]
    fn child_gains_parent_nodes_and_kick_power() {
        let (composer, _) = compose(&[
            RoleDeclaration::new("admin", 20)
                .nodes(&["banana.ban"])
                .kick_power(2)
                .inherits(&[InheritRole::Name("moderator")]),
            RoleDeclaration::new("moderator", 10)
                .nodes(&["banana.kick", "banana.mute"])
                .kick_power(30)
                .required_kick_power(5)
                .permissions(PermissionFlags::from_bits(0b100)),
        ]);

        let admin = composer.roles().get("admin").unwrap();
        assert_eq!(admin.permission_nodes, ["banana.ban", "banana.kick", "banana.mute"]);
        assert_eq!(admin.kick_power, 30);
        assert_eq!(admin.required_kick_power, 5);
        assert!(admin.permissions.contains(PermissionFlags::from_bits(0b100)));
        assert_eq!(admin.primary_node.as_deref(), Some("banana.ban"));
        assert_eq!(admin.inherits, ["moderator"]);

        let moderator = composer.roles().get("moderator").unwrap();
        assert!(!moderator.permission_nodes.contains(&"banana.ban".to_string()));
    }

    #[test]
    fn inheritance_chains_are_transitive() {
        let (composer, _) = compose(&[
            RoleDeclaration::new("x", 3).nodes(&["x"]).inherits(&[InheritRole::Name("y")]),
            RoleDeclaration::new("y", 2).nodes(&["y"]).inherits(&[InheritRole::Name("z")]),
            RoleDeclaration::new("z", 1).nodes(&["z", "y"]),
        ]);

        let x = composer.roles().get("x").unwrap();
        assert_eq!(x.permission_nodes, ["x", "y", "z"]);
        let order: Vec<_> = composer.roles().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, ["z", "y", "x"]);
    }

    #[test]
    fn references_resolve_by_type_and_missing_ones_are_dropped() {
        let (composer, _) = compose(&[
            RoleDeclaration::new("owner", 5)
                .inherits(&[InheritRole::Type("StaffRole"), InheritRole::Name("ghost")]),
            RoleDeclaration::new("staff", 1)
                .type_name("StaffRole")
                .nodes(&["banana.staff"]),
        ]);

        let owner = composer.roles().get("owner").unwrap();
        assert_eq!(owner.inherits, ["staff"]);
        assert_eq!(owner.permission_nodes, ["banana.staff"]);
        assert_eq!(owner.primary_node, None);
        assert!(composer.roles().lookup("StaffRole").is_some());
    }

    #[test]
    fn optional_fields_inherit_then_default() {
        let (composer, store) = compose(&[
            RoleDeclaration::new("vip", 1)
                .badge_color(RoleColor::Pumpkin)
                .auto_hide(true),
            RoleDeclaration::new("vip_plus", 2)
                .display_name("VIP+")
                .cover(false)
                .inherits(&[InheritRole::Name("vip")]),
            RoleDeclaration::new("plain", 0),
        ]);

        let vip_plus = composer.roles().get("vip_plus").unwrap();
        assert_eq!(vip_plus.badge_color, RoleColor::Pumpkin);
        assert!(vip_plus.auto_hide);
        assert!(!vip_plus.cover);
        assert_eq!(vip_plus.display_name, "VIP+");

        let plain = store.get("plain").unwrap();
        assert_eq!(plain.badge_color, "white");
        assert_eq!(plain.badge_text, "plain");
        assert!(plain.cover);
        assert!(!plain.hidden_by_default);
        assert_eq!(plain.kick_power, 0);
    }

    #[test]
    #[traced_test]
    fn duplicate_names_keep_the_last_declaration() {
        let (composer, _) = compose(&[
            RoleDeclaration::new("mod", 1).type_name("First").nodes(&["a"]),
            RoleDeclaration::new("mod", 1).type_name("Second").nodes(&["b"]),
        ]);

        assert_eq!(composer.roles().len(), 1);
        assert_eq!(composer.roles().get("mod").unwrap().permission_nodes, ["b"]);
        assert!(logs_contain("Duplicate role name"));
    }

    #[test]
    fn republishing_unions_flags() {
        let store = MemoryPermissionStore::new();
        let mut composer = RoleComposer::new();

        composer.compose(
            &[RoleDeclaration::new("a", 1).permissions(PermissionFlags::from_bits(0b001))],
            &store,
        );
        composer.compose(
            &[RoleDeclaration::new("a", 1).permissions(PermissionFlags::from_bits(0b010))],
            &store,
        );

        assert_eq!(store.get("a").unwrap().permissions.bits(), 0b011);
        assert_eq!(composer.state(), RoleLoadState::Loaded);
    }

    #[test]
    fn publishing_overwrites_only_set_fields() {
        let store = MemoryPermissionStore::new();
        let mut existing = banana_core::PermissionGroup::new("a");
        existing.kick_power = 50;
        existing.required_kick_power = 40;
        existing.badge_color = "red".into();
        existing.badge_text = "Old".into();
        existing.cover = true;
        existing.hidden_by_default = true;
        store.put(existing.clone());
        store.put(banana_core::PermissionGroup { name: "b".into(), ..existing });

        let mut composer = RoleComposer::new();
        composer.compose(
            &[
                RoleDeclaration::new("a", 1)
                    .badge_color(RoleColor::Mint)
                    .display_name("New")
                    .cover(false)
                    .kick_power(10)
                    .required_kick_power(5),
                RoleDeclaration::new("b", 1),
            ],
            &store,
        );

        let a = store.get("a").unwrap();
        assert_eq!(a.badge_color, "mint");
        assert_eq!(a.badge_text, "New");
        assert!(!a.cover);
        assert!(a.hidden_by_default);
        assert_eq!(a.kick_power, 10);
        assert_eq!(a.required_kick_power, 40);

        let b = store.get("b").unwrap();
        assert_eq!((b.kick_power, b.badge_color.as_str()), (50, "red"));
        assert_eq!(b.badge_text, "Old");
        assert_eq!(composer.roles().get("b").unwrap().group.as_deref(), Some("b"));
    }

    #[test]
    fn name_and_type_references_do_not_cross() {
        let (composer, _) = compose(&[
            RoleDeclaration::new("StaffRole", 1)
                .type_name("NamedRole")
                .nodes(&["by.name"]),
            RoleDeclaration::new("staff", 1)
                .type_name("StaffRole")
                .nodes(&["by.type"]),
            RoleDeclaration::new("typed", 2).inherits(&[InheritRole::Type("StaffRole")]),
            RoleDeclaration::new("named", 2).inherits(&[InheritRole::Name("StaffRole")]),
            RoleDeclaration::new("neither", 2).inherits(&[InheritRole::Name("NamedRole")]),
        ]);

        let roles = composer.roles();
        assert_eq!(roles.get("typed").unwrap().permission_nodes, ["by.type"]);
        assert_eq!(roles.get("named").unwrap().permission_nodes, ["by.name"]);
        assert!(roles.get("neither").unwrap().inherits.is_empty());
    }

    #[test]
    fn unload_clears_roles() {
        let (mut composer, store) = compose(&[RoleDeclaration::new("a", 1).nodes(&["n"])]);
        assert!(composer.permissions().has_permissions("a", &["n"]));

        composer.unload();

        assert_eq!(composer.state(), RoleLoadState::Unloaded);
        assert!(composer.roles().is_empty());
        assert!(!composer.permissions().has_permissions("a", &["n"]));
        assert_eq!(store.len(), 1);
    }
}
