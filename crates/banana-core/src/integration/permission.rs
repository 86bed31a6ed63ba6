//! Permission-group store interface.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::foundation::color::RoleColor;
use crate::foundation::flags::PermissionFlags;

/// A named permission-group record as held by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    /// Group name (unique key).
    pub name: String,
    /// Coarse permission flags.
    pub permissions: PermissionFlags,
    /// Badge color, lowercase.
    pub badge_color: String,
    /// Badge text.
    pub badge_text: String,
    /// Whether the badge covers other badges.
    pub cover: bool,
    /// Whether the badge starts hidden.
    pub hidden_by_default: bool,
    /// Kick power granted to members.
    pub kick_power: u8,
    /// Kick power needed to kick a member.
    pub required_kick_power: u8,
}

impl PermissionGroup {
    /// A fresh record with host defaults: no permissions, white badge
    /// showing the group name, covering, visible, no kick power.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            badge_text: name.clone(),
            name,
            permissions: PermissionFlags::EMPTY,
            badge_color: RoleColor::White.as_str().to_string(),
            cover: true,
            hidden_by_default: false,
            kick_power: 0,
            required_kick_power: 0,
        }
    }
}

/// The host's permission-group storage.
///
/// Mutation happens only while roles are published, which runs without
/// yielding, so implementations need no cross-call transactions.
pub trait PermissionStore: Send + Sync {
    /// Fetches a group by name.
    fn get(&self, name: &str) -> Option<PermissionGroup>;

    /// Inserts or replaces a group.
    fn put(&self, group: PermissionGroup);

    /// Fetches a group, creating a default record if absent.
    ///
    /// Returns the record and whether it was created.
    fn fetch_or_create(&self, name: &str) -> (PermissionGroup, bool) {
        match self.get(name) {
            Some(group) => (group, false),
            None => (PermissionGroup::new(name), true),
        }
    }
}

/// An in-memory [`PermissionStore`], ordered by group name.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    groups: RwLock<BTreeMap<String, PermissionGroup>>,
}

impl MemoryPermissionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every group.
    pub fn groups(&self) -> Vec<PermissionGroup> {
        self.groups.read().values().cloned().collect()
    }

    /// Number of stored groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if no group is stored.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl PermissionStore for MemoryPermissionStore {
    fn get(&self, name: &str) -> Option<PermissionGroup> {
        self.groups.read().get(name).cloned()
    }

    fn put(&self, group: PermissionGroup) {
        self.groups.write().insert(group.name.clone(), group);
    }
}
