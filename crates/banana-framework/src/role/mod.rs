//! Role declarations and the role composition engine.
//!
//! Roles are permission profiles published into the host's permission-group
//! store. A role may inherit other roles; inheritance pulls the parent's
//! nodes, flags and kick powers into the child, never the other way round.
//!
//! ```rust,ignore
//! pub static MODERATOR: RoleDeclaration = RoleDeclaration::new("moderator", 10)
//!     .nodes(&["banana.kick", "banana.mute"])
//!     .kick_power(20)
//!     .badge_color(RoleColor::Cyan);
//!
//! pub static ADMIN: RoleDeclaration = RoleDeclaration::new("admin", 20)
//!     .nodes(&["banana.ban"])
//!     .inherits(&[InheritRole::Name("moderator")]);
//! ```

mod composer;
mod permissions;

pub use composer::{RoleComposer, RoleLoadState};
pub use permissions::GroupPermissions;

use banana_core::{PermissionFlags, PermissionGroup, RoleColor};

// ============================================================================
// RoleDeclaration
// ============================================================================

/// Reference to an inherited role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InheritRole {
    /// By role name.
    Name(&'static str),
    /// By declared type name.
    Type(&'static str),
}

impl InheritRole {
    fn target(self) -> &'static str {
        match self {
            Self::Name(target) | Self::Type(target) => target,
        }
    }
}

/// A role as declared by a plugin.
///
/// Optional fields left `None` are inherited, then fall back to the global
/// defaults (white badge, covering, visible, kick powers 0, display name =
/// role name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDeclaration {
    /// Declaring type; defaults to the role name.
    pub type_name: &'static str,
    /// Unique role name, also the permission-group name.
    pub name: &'static str,
    /// Merge order: lower ranks are merged first.
    pub hierarchy: u16,
    /// Declared intent to replace a same-named group. Publishing always
    /// applies the set fields, so this is informational.
    pub override_existing: bool,
    /// Permission nodes; the first one is the role's primary node.
    pub permission_nodes: &'static [&'static str],
    /// Coarse permission flags.
    pub permissions: PermissionFlags,
    /// Kick power.
    pub kick_power: Option<u8>,
    /// Kick power needed to kick a member.
    pub required_kick_power: Option<u8>,
    /// Badge text.
    pub display_name: Option<&'static str>,
    /// Badge color.
    pub badge_color: Option<RoleColor>,
    /// Whether the badge covers other badges.
    pub cover: Option<bool>,
    /// Whether the badge starts hidden.
    pub auto_hide: Option<bool>,
    /// Inherited roles.
    pub inherits: &'static [InheritRole],
    /// Obsolete roles are skipped by discovery.
    pub obsolete: bool,
}

impl RoleDeclaration {
    /// Declares a role with every optional field unset.
    pub const fn new(name: &'static str, hierarchy: u16) -> Self {
        Self {
            type_name: name,
            name,
            hierarchy,
            override_existing: false,
            permission_nodes: &[],
            permissions: PermissionFlags::EMPTY,
            kick_power: None,
            required_kick_power: None,
            display_name: None,
            badge_color: None,
            cover: None,
            auto_hide: None,
            inherits: &[],
            obsolete: false,
        }
    }

    /// Sets the declaring type name.
    pub const fn type_name(mut self, type_name: &'static str) -> Self {
        self.type_name = type_name;
        self
    }

    /// Sets the permission nodes.
    pub const fn nodes(mut self, nodes: &'static [&'static str]) -> Self {
        self.permission_nodes = nodes;
        self
    }

    /// Sets the permission flags.
    pub const fn permissions(mut self, permissions: PermissionFlags) -> Self {
        self.permissions = permissions;
        self
    }

    /// Sets the kick power.
    pub const fn kick_power(mut self, power: u8) -> Self {
        self.kick_power = Some(power);
        self
    }

    /// Sets the required kick power.
    pub const fn required_kick_power(mut self, power: u8) -> Self {
        self.required_kick_power = Some(power);
        self
    }

    /// Sets the badge text.
    pub const fn display_name(mut self, text: &'static str) -> Self {
        self.display_name = Some(text);
        self
    }

    /// Sets the badge color.
    pub const fn badge_color(mut self, color: RoleColor) -> Self {
        self.badge_color = Some(color);
        self
    }

    /// Sets whether the badge covers others.
    pub const fn cover(mut self, cover: bool) -> Self {
        self.cover = Some(cover);
        self
    }

    /// Sets whether the badge starts hidden.
    pub const fn auto_hide(mut self, hide: bool) -> Self {
        self.auto_hide = Some(hide);
        self
    }

    /// Sets the inherited roles.
    pub const fn inherits(mut self, roles: &'static [InheritRole]) -> Self {
        self.inherits = roles;
        self
    }

    /// Marks the role as meant to replace a same-named group.
    pub const fn override_existing(mut self) -> Self {
        self.override_existing = true;
        self
    }

    /// Marks the role obsolete.
    pub const fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }
}

// ============================================================================
// ResolvedRole
// ============================================================================

/// Fields that came from a declaration or an inherited role, before global
/// defaults. Publishing only overwrites existing groups with these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleOverrides {
    /// Kick power.
    pub kick_power: Option<u8>,
    /// Required kick power.
    pub required_kick_power: Option<u8>,
    /// Badge text.
    pub display_name: Option<String>,
    /// Badge color.
    pub badge_color: Option<RoleColor>,
    /// Badge cover.
    pub cover: Option<bool>,
    /// Badge hidden by default.
    pub auto_hide: Option<bool>,
}

/// A fully merged role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    /// Declaring type.
    pub type_name: &'static str,
    /// Role and group name.
    pub name: String,
    /// Merge rank.
    pub hierarchy: u16,
    /// Declared replace intent.
    pub override_existing: bool,
    /// Own nodes followed by inherited ones, without repeats.
    pub permission_nodes: Vec<String>,
    /// Union of own and inherited flags.
    pub permissions: PermissionFlags,
    /// Kick power.
    pub kick_power: u8,
    /// Required kick power.
    pub required_kick_power: u8,
    /// Badge text.
    pub display_name: String,
    /// Badge color.
    pub badge_color: RoleColor,
    /// Badge cover.
    pub cover: bool,
    /// Badge hidden by default.
    pub auto_hide: bool,
    /// Names of the resolved parents.
    pub inherits: Vec<String>,
    /// Declared-or-inherited optional fields.
    pub overrides: RoleOverrides,
    /// The first declared node.
    pub primary_node: Option<String>,
    /// Group the role was published into.
    pub group: Option<String>,
}

impl ResolvedRole {
    /// A fresh group record built from this role.
    pub fn to_group(&self) -> PermissionGroup {
        PermissionGroup {
            name: self.name.clone(),
            permissions: self.permissions,
            badge_color: self.badge_color.as_str().to_string(),
            badge_text: self.display_name.clone(),
            cover: self.cover,
            hidden_by_default: self.auto_hide,
            kick_power: self.kick_power,
            required_kick_power: self.required_kick_power,
        }
    }

    /// Folds this role into an existing group.
    ///
    /// Flags are unioned and the required kick power raised. Every other
    /// field the role declared or inherited replaces the group's value;
    /// fields left unset keep it.
    pub fn merge_into(&self, group: &mut PermissionGroup) {
        group.permissions.include(self.permissions);
        group.required_kick_power = group.required_kick_power.max(self.required_kick_power);

        let overrides = &self.overrides;
        if let Some(power) = overrides.kick_power {
            group.kick_power = power;
        }
        if let Some(color) = overrides.badge_color {
            group.badge_color = color.as_str().to_string();
        }
        if let Some(text) = &overrides.display_name {
            group.badge_text = text.clone();
        }
        if let Some(cover) = overrides.cover {
            group.cover = cover;
        }
        if let Some(hide) = overrides.auto_hide {
            group.hidden_by_default = hide;
        }
    }
}

// ============================================================================
// RoleCollection
// ============================================================================

/// Resolved roles in merge order (ascending hierarchy).
#[derive(Debug, Clone, Default)]
pub struct RoleCollection {
    roles: Vec<ResolvedRole>,
}

impl RoleCollection {
    pub(crate) fn from_roles(roles: Vec<ResolvedRole>) -> Self {
        Self { roles }
    }

    /// Looks a role up by name.
    pub fn get(&self, name: &str) -> Option<&ResolvedRole> {
        self.roles.iter().find(|r| r.name == name)
    }

    /// Looks a role up by declared type name.
    pub fn get_by_type(&self, type_name: &str) -> Option<&ResolvedRole> {
        self.roles.iter().find(|r| r.type_name == type_name)
    }

    /// Looks a role up by name, then by type.
    pub fn lookup(&self, reference: &str) -> Option<&ResolvedRole> {
        self.get(reference).or_else(|| self.get_by_type(reference))
    }

    /// Iterates in merge order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedRole> {
        self.roles.iter()
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if no role is loaded.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
