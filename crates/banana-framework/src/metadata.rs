//! Metadata registry.
//!
//! Two indexes live here:
//!
//! - [`EventMetadata`]: every host event known to the process, keyed by
//!   argument type and by qualified name. Built once per
//!   [`MetadataRegistry`] and shared afterwards.
//! - [`DescriptorIndex`]: the feature, role and server declarations of a set
//!   of plugin modules, with obsolete entries filtered out. Order is stable:
//!   module load order first, then declaration order within a module.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use banana_core::{EventBus, EventDescriptor, registered_host_events};
use tracing::{debug, info, warn};

use crate::feature::FeatureDeclaration;
use crate::plugin::PluginModule;
use crate::role::RoleDeclaration;
use crate::server::ServerProfile;

// ============================================================================
// EventMetadata
// ============================================================================

/// Lookup tables over the host's events.
#[derive(Debug, Clone, Default)]
pub struct EventMetadata {
    events: Vec<EventDescriptor>,
    by_args: HashMap<TypeId, EventDescriptor>,
}

impl EventMetadata {
    /// Indexes `descriptors`, skipping repeats.
    ///
    /// When two events share an argument type, the first one keeps the type
    /// mapping; the second is reachable by name only.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = EventDescriptor>) -> Self {
        let mut metadata = Self::default();
        for event in descriptors {
            if metadata.events.contains(&event) {
                continue;
            }
            if let Some(existing) = metadata.by_args.get(&event.args) {
                warn!(
                    event = %event,
                    existing = %existing,
                    args = event.args_name,
                    "Argument type already maps to another event; bind by name instead"
                );
            } else {
                metadata.by_args.insert(event.args, event);
            }
            metadata.events.push(event);
        }
        metadata
    }

    /// Indexes the linked [`HOST_EVENTS`](banana_core::HOST_EVENTS) and the
    /// bus's exposed events.
    pub fn scan(bus: &dyn EventBus) -> Self {
        Self::from_descriptors(registered_host_events().chain(bus.exposed_events()))
    }

    /// The event carrying argument type `args`.
    pub fn by_args(&self, args: TypeId) -> Option<&EventDescriptor> {
        self.by_args.get(&args)
    }

    /// The first indexed event named `owner.name`.
    pub fn by_name(&self, owner: &str, name: &str) -> Option<&EventDescriptor> {
        self.events.iter().find(|e| e.is_named(owner, name))
    }

    /// Every indexed event, in scan order.
    pub fn events(&self) -> &[EventDescriptor] {
        &self.events
    }

    /// Number of indexed events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event is indexed.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ============================================================================
// MetadataRegistry
// ============================================================================

/// Owner of the cached [`EventMetadata`].
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    events: OnceLock<Arc<EventMetadata>>,
}

impl MetadataRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans the host's events on first call; later calls return the cache.
    pub fn register_event_metadata(&self, bus: &dyn EventBus) -> Arc<EventMetadata> {
        let metadata = self.events.get_or_init(|| {
            let metadata = EventMetadata::scan(bus);
            info!(events = metadata.len(), "Registered event metadata");
            Arc::new(metadata)
        });
        Arc::clone(metadata)
    }

    /// The cached metadata, if scanned.
    pub fn event_metadata(&self) -> Option<Arc<EventMetadata>> {
        self.events.get().cloned()
    }

    /// Indexes the declarations of `modules`, in the order given.
    pub fn find_descriptors<'a>(
        &self,
        modules: impl IntoIterator<Item = &'a PluginModule>,
    ) -> DescriptorIndex<'a> {
        let mut index = DescriptorIndex::default();
        for (position, module) in modules.into_iter().enumerate() {
            let plugin = module.name();
            for feature in module.features() {
                if feature.is_obsolete() {
                    debug!(plugin, feature = feature.type_name(), "Skipping obsolete feature");
                    continue;
                }
                index.features.push(Discovered::new(position, plugin, feature));
            }
            for role in module.roles() {
                if role.obsolete {
                    debug!(plugin, role = role.name, "Skipping obsolete role");
                    continue;
                }
                index.roles.push(Discovered::new(position, plugin, role));
            }
            for server in module.servers() {
                if server.obsolete {
                    debug!(plugin, server = server.id, "Skipping obsolete server");
                    continue;
                }
                index.servers.push(Discovered::new(position, plugin, server));
            }
        }
        index
    }
}

// ============================================================================
// DescriptorIndex
// ============================================================================

/// A declaration together with the module it came from.
#[derive(Debug)]
pub struct Discovered<'a, T> {
    /// Position of the module in load order.
    pub module: usize,
    /// Plugin name.
    pub plugin: &'a str,
    /// The declaration.
    pub item: &'a T,
}

impl<T> Clone for Discovered<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Discovered<'_, T> {}

impl<'a, T> Discovered<'a, T> {
    fn new(module: usize, plugin: &'a str, item: &'a T) -> Self {
        Self {
            module,
            plugin,
            item,
        }
    }
}

/// Non-obsolete declarations, in module then declaration order.
#[derive(Debug, Clone)]
pub struct DescriptorIndex<'a> {
    /// Feature declarations.
    pub features: Vec<Discovered<'a, FeatureDeclaration>>,
    /// Role declarations.
    pub roles: Vec<Discovered<'a, RoleDeclaration>>,
    /// Server profiles.
    pub servers: Vec<Discovered<'a, ServerProfile>>,
}

impl Default for DescriptorIndex<'_> {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            roles: Vec::new(),
            servers: Vec::new(),
        }
    }
}

impl<'a> DescriptorIndex<'a> {
    /// Features of the module at `module`.
    pub fn features_of(&self, module: usize) -> impl Iterator<Item = &'a FeatureDeclaration> + '_ {
        self.features
            .iter()
            .filter(move |d| d.module == module)
            .map(|d| d.item)
    }

    /// Servers of the module at `module`.
    pub fn servers_of(&self, module: usize) -> impl Iterator<Item = &'a ServerProfile> + '_ {
        self.servers
            .iter()
            .filter(move |d| d.module == module)
            .map(|d| d.item)
    }

    /// Every role, across modules.
    pub fn roles(&self) -> impl Iterator<Item = &'a RoleDeclaration> + '_ {
        self.roles.iter().map(|d| d.item)
    }
}
