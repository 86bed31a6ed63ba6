use std::collections::HashMap;

use tracing::warn;

use super::RoleCollection;

/// Permission nodes held by each group, derived from the resolved roles.
///
/// The table is rebuilt on every composition pass; runtime edits are not
/// supported.
#[derive(Debug, Clone, Default)]
pub struct GroupPermissions {
    groups: HashMap<String, Vec<String>>,
    primary_nodes: HashMap<String, String>,
}

impl GroupPermissions {
    /// Builds the table from published roles.
    pub fn from_roles(roles: &RoleCollection) -> Self {
        let mut table = Self::default();
        for role in roles.iter() {
            let Some(group) = &role.group else {
                continue;
            };
            let nodes = table.groups.entry(group.clone()).or_default();
            for node in &role.permission_nodes {
                if !nodes.contains(node) {
                    nodes.push(node.clone());
                }
            }
            if let Some(primary) = &role.primary_node {
                table.primary_nodes.insert(role.name.clone(), primary.clone());
                table
                    .primary_nodes
                    .entry(role.type_name.to_string())
                    .or_insert_with(|| primary.clone());
            }
        }
        table
    }

    /// Nodes held by `group`.
    pub fn permissions(&self, group: &str) -> &[String] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `group` holds every node in `required`.
    pub fn has_permissions(&self, group: &str, required: &[&str]) -> bool {
        let held = self.permissions(group);
        !held.is_empty() && required.iter().all(|node| held.iter().any(|h| h == node))
    }

    /// Whether `group` holds at least one node in `any`.
    pub fn has_any_permission(&self, group: &str, any: &[&str]) -> bool {
        let held = self.permissions(group);
        any.iter().any(|node| held.iter().any(|h| h == node))
    }

    /// Whether `group` holds the primary node of a role, referenced by name
    /// or type. Roles without nodes are never held.
    pub fn has_role(&self, group: &str, role: &str) -> bool {
        self.primary_nodes
            .get(role)
            .is_some_and(|node| self.has_permissions(group, &[node.as_str()]))
    }

    /// Known group names.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Not supported; nodes come from role declarations only.
    pub fn add_permissions(&self, group: &str, nodes: &[&str]) -> bool {
        warn!(group, ?nodes, "Adding permissions at runtime is not supported");
        false
    }

    /// Not supported; nodes come from role declarations only.
    pub fn remove_permissions(&self, group: &str, nodes: &[&str]) -> bool {
        warn!(group, ?nodes, "Removing permissions at runtime is not supported");
        false
    }

    /// Not supported; reload the runtime to recompose roles.
    pub fn reload(&self) -> bool {
        warn!("Permissions are rebuilt with the roles; reload the runtime instead");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{InheritRole, RoleComposer, RoleDeclaration};
    use banana_core::MemoryPermissionStore;
    use tracing_test::traced_test;

    fn table() -> GroupPermissions {
        let store = MemoryPermissionStore::new();
        let mut composer = RoleComposer::new();
        composer.compose(
            &[
                RoleDeclaration::new("helper", 1).type_name("HelperRole").nodes(&["banana.helper", "banana.chat"]),
                RoleDeclaration::new("moderator", 2)
                    .nodes(&["banana.moderator", "banana.kick"])
                    .inherits(&[InheritRole::Name("helper")]),
                RoleDeclaration::new("guest", 0),
            ],
            &store,
        );
        composer.permissions().clone()
    }

    #[test]
    fn checks_all_and_any() {
        let table = table();
        assert!(table.has_permissions("moderator", &["banana.kick", "banana.chat"]));
        assert!(!table.has_permissions("helper", &["banana.kick", "banana.chat"]));
        assert!(table.has_any_permission("helper", &["banana.kick", "banana.chat"]));
        assert!(!table.has_any_permission("nobody", &["banana.chat"]));
        assert!(table.permissions("guest").is_empty());
    }

    #[test]
    fn roles_are_held_through_their_primary_node() {
        let table = table();
        assert!(table.has_role("moderator", "helper"));
        assert!(table.has_role("moderator", "HelperRole"));
        assert!(!table.has_role("helper", "moderator"));
        assert!(!table.has_role("guest", "guest"));
    }

    #[test]
    #[traced_test]
    fn runtime_edits_are_refused() {
        let table = table();
        assert!(!table.add_permissions("helper", &["banana.ban"]));
        assert!(!table.remove_permissions("helper", &["banana.chat"]));
        assert!(!table.reload());
        assert!(!table.has_permissions("helper", &["banana.ban"]));
        assert!(logs_contain("not supported"));
    }
}
