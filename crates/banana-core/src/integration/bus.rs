//! Event bus interface and the in-process implementation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::BindingResult;
use crate::foundation::event::{EventDescriptor, EventHandler, HostEvent};

/// Identifies one attached handler, returned by [`EventBus::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Wraps a raw id; buses choose their own numbering.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The host's event bus.
pub trait EventBus: Send + Sync {
    /// Publicly exposed events, with their argument types.
    fn exposed_events(&self) -> Vec<EventDescriptor>;

    /// Attaches `handler` to `event`.
    fn attach(&self, event: &EventDescriptor, handler: EventHandler) -> BindingResult<HandlerId>;

    /// Detaches a handler. Returns `false` if it was not attached.
    fn detach(&self, event: &EventDescriptor, id: HandlerId) -> bool;
}

/// An in-process [`EventBus`].
///
/// Handlers run synchronously on the publishing thread, in attach order.
/// The handler list is snapshotted before delivery, so a handler may detach
/// itself (or others) while running.
#[derive(Default)]
pub struct LocalEventBus {
    exposed: RwLock<Vec<EventDescriptor>>,
    handlers: RwLock<HashMap<EventDescriptor, Vec<(HandlerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl LocalEventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes the event of argument type `E`.
    pub fn expose<E: HostEvent>(&self) -> &Self {
        self.expose_descriptor(E::descriptor())
    }

    /// Exposes an event by descriptor. Exposing twice is a no-op.
    pub fn expose_descriptor(&self, event: EventDescriptor) -> &Self {
        let mut exposed = self.exposed.write();
        if !exposed.contains(&event) {
            exposed.push(event);
        }
        self
    }

    /// Delivers `args` to every handler of `E`'s event.
    ///
    /// Returns the number of handlers called.
    pub fn emit<E: HostEvent>(&self, args: &E) -> usize {
        self.publish(&E::descriptor(), args)
    }

    /// Delivers `args` to every handler of `event`.
    pub fn publish(&self, event: &EventDescriptor, args: &dyn Any) -> usize {
        let snapshot: Vec<EventHandler> = self
            .handlers
            .read()
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        trace!(event = %event, handlers = snapshot.len(), "Publishing host event");
        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    /// Number of handlers currently attached to `event`.
    pub fn handler_count(&self, event: &EventDescriptor) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    /// Number of handlers attached across all events.
    pub fn total_handlers(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }
}

impl EventBus for LocalEventBus {
    fn exposed_events(&self) -> Vec<EventDescriptor> {
        self.exposed.read().clone()
    }

    fn attach(&self, event: &EventDescriptor, handler: EventHandler) -> BindingResult<HandlerId> {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(*event)
            .or_default()
            .push((id, handler));
        debug!(event = %event, handler = id.0, "Handler attached");
        Ok(id)
    }

    fn detach(&self, event: &EventDescriptor, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        if removed {
            debug!(event = %event, handler = id.0, "Handler detached");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::event::typed_handler;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    struct Tick(usize);

    impl HostEvent for Tick {
        const OWNER: &'static str = "Server";
        const NAME: &'static str = "Tick";
    }

    #[test]
    fn attach_publish_detach() {
        let bus = LocalEventBus::new();
        bus.expose::<Tick>();
        let total = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&total);

        let event = Tick::descriptor();
        let id = bus
            .attach(
                &event,
                typed_handler(move |t: &Tick| {
                    sink.fetch_add(t.0, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(bus.emit(&Tick(3)), 1);
        assert!(bus.detach(&event, id));
        assert!(!bus.detach(&event, id));
        assert_eq!(bus.emit(&Tick(3)), 0);
        assert_eq!(total.load(Ordering::SeqCst), 3);
        assert_eq!(bus.exposed_events(), vec![event]);
    }

    #[test]
    fn handler_may_detach_itself_while_running() {
        let bus = Arc::new(LocalEventBus::new());
        let event = Tick::descriptor();
        let slot: Arc<parking_lot::Mutex<Option<HandlerId>>> = Arc::default();

        let handler_bus = Arc::clone(&bus);
        let handler_slot = Arc::clone(&slot);
        let id = bus
            .attach(
                &event,
                Arc::new(move |_: &dyn Any| {
                    if let Some(id) = handler_slot.lock().take() {
                        handler_bus.detach(&Tick::descriptor(), id);
                    }
                }),
            )
            .unwrap();
        *slot.lock() = Some(id);

        assert_eq!(bus.emit(&Tick(1)), 1);
        assert_eq!(bus.handler_count(&event), 0);
    }
}
