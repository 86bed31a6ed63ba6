//! Host event descriptors.
//!
//! The host game server exposes named events grouped by an owner type
//! (`Player.Joined`, `Server.WaitingForPlayers`, ...). Every event carries a
//! single argument type. This module provides:
//!
//! - [`EventDescriptor`] - the identity of one host event
//! - [`HostEvent`] - implemented by event-argument types, ties a type to its event
//! - [`HOST_EVENTS`] - a link-time registry of every [`HostEvent`] compiled in
//! - [`EventHandler`] - a type-erased handler the event bus can call
//!
//! # Declaring an event argument type
//!
//! ```rust,ignore
//! use banana::prelude::*;
//!
//! #[host_event(owner = "Player", name = "Joined")]
//! pub struct PlayerJoined {
//!     pub player_id: u32,
//! }
//! ```
//!
//! The attribute implements [`HostEvent`] and appends the descriptor to
//! [`HOST_EVENTS`], so the metadata registry can map `PlayerJoined` back to
//! `Player.Joined` without an explicit name on every handler.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::warn;

// ============================================================================
// EventDescriptor
// ============================================================================

/// Identity of one host event: owner, name, and argument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    /// Type (or group) that exposes the event, e.g. `"Player"`.
    pub owner: &'static str,
    /// Event name within its owner, e.g. `"Joined"`.
    pub name: &'static str,
    /// [`TypeId`] of the argument type.
    pub args: TypeId,
    /// Readable name of the argument type, for diagnostics.
    pub args_name: &'static str,
}

impl EventDescriptor {
    /// Builds the descriptor of an event whose argument type is `A`.
    pub fn of<A: Any>(owner: &'static str, name: &'static str) -> Self {
        Self {
            owner,
            name,
            args: TypeId::of::<A>(),
            args_name: type_name::<A>(),
        }
    }

    /// Returns `true` when `owner` and `name` identify this event.
    pub fn is_named(&self, owner: &str, name: &str) -> bool {
        self.owner == owner && self.name == name
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

// ============================================================================
// HostEvent
// ============================================================================

/// Implemented by event-argument types to name the event they belong to.
///
/// Usually derived with `#[host_event(owner = "…", name = "…")]`.
pub trait HostEvent: Any + Send + Sync {
    /// Owner of the event.
    const OWNER: &'static str;
    /// Event name.
    const NAME: &'static str;

    /// Returns the descriptor of this event.
    fn descriptor() -> EventDescriptor
    where
        Self: Sized,
    {
        EventDescriptor::of::<Self>(Self::OWNER, Self::NAME)
    }
}

/// Entry type of [`HOST_EVENTS`].
pub type HostEventFn = fn() -> EventDescriptor;

/// Registry of every [`HostEvent`] linked into the process.
///
/// Each `#[host_event]` type contributes one entry.
#[distributed_slice]
pub static HOST_EVENTS: [HostEventFn];

/// Iterates the descriptors of [`HOST_EVENTS`] in link order.
pub fn registered_host_events() -> impl Iterator<Item = EventDescriptor> {
    HOST_EVENTS.iter().map(|entry| entry())
}

// ============================================================================
// Handlers
// ============================================================================

/// Type-erased event handler stored by the event bus.
pub type EventHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Wraps a typed closure into an [`EventHandler`].
///
/// Arguments of any other type are dropped with a warning; the bus should
/// never deliver them once a binding has been resolved.
pub fn typed_handler<A, F>(handler: F) -> EventHandler
where
    A: Any,
    F: Fn(&A) + Send + Sync + 'static,
{
    Arc::new(move |args: &dyn Any| match args.downcast_ref::<A>() {
        Some(args) => handler(args),
        None => warn!(
            expected = type_name::<A>(),
            "Event delivered with unexpected argument type; handler skipped"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Joined {
        id: u32,
    }

    impl HostEvent for Joined {
        const OWNER: &'static str = "Player";
        const NAME: &'static str = "Joined";
    }

    #[test]
    fn descriptor_carries_owner_name_and_args() {
        let desc = Joined::descriptor();
        assert!(desc.is_named("Player", "Joined"));
        assert_eq!(desc.args, TypeId::of::<Joined>());
        assert_eq!(desc.to_string(), "Player.Joined");
    }

    #[test]
    fn typed_handler_ignores_foreign_arguments() {
        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);
        let handler = typed_handler(move |args: &Joined| {
            sink.fetch_add(args.id, Ordering::SeqCst);
        });

        handler(&Joined { id: 7 });
        handler(&"not an event");

        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn ready_signal_is_linked_into_host_events() {
        assert!(
            registered_host_events().any(|d| d.is_named("Server", "WaitingForPlayers"))
        );
    }
}
