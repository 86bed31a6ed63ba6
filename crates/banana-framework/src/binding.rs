//! Event binding manager.
//!
//! Features declare their handlers as [`EventBinding`] values. When a
//! feature is enabled the [`BindingManager`] resolves each binding to a host
//! event and attaches it to the [`EventBus`]; disabling reverses this.
//!
//! A binding's event is resolved by:
//!
//! 1. the handler's argument type, looked up in the [`EventMetadata`]
//! 2. an explicit `owner`/`name` pair, when the argument type is unknown
//!
//! ```rust,ignore
//! fn event_bindings(&self) -> Vec<EventBinding> {
//!     let seen = Arc::clone(&self.seen);
//!     vec![
//!         EventBinding::on("on_joined", move |ev: &PlayerJoined| {
//!             seen.fetch_add(1, Ordering::Relaxed);
//!         }),
//!         EventBinding::raw("on_round_end", "Server", "RoundEnded", Arc::new(|_| {}))
//!             .manual(),
//!     ]
//! }
//! ```
//!
//! Every failure here is logged and skips a single binding.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use banana_core::{
    BindingError, BindingResult, EventBus, EventDescriptor, EventHandler, HandlerId, typed_handler,
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::metadata::EventMetadata;

// ============================================================================
// Identity
// ============================================================================

/// Identifies a live instance that owns bindings (a feature instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The raw id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One (declaration, instance) pair. At most one binding exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    /// Owning type.
    pub owner: &'static str,
    /// Handler method name.
    pub method: &'static str,
    /// Owning instance; `None` for static handlers.
    pub instance: Option<InstanceId>,
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)?;
        if let Some(instance) = self.instance {
            write!(f, "{instance}")?;
        }
        Ok(())
    }
}

// ============================================================================
// EventBinding
// ============================================================================

/// A handler method declared for a host event.
#[derive(Clone)]
pub struct EventBinding {
    method: &'static str,
    auto_register: bool,
    args: Option<(TypeId, &'static str)>,
    named: Option<(&'static str, &'static str)>,
    handler: EventHandler,
}

impl EventBinding {
    /// Binds `handler` to the event whose argument type is `A`.
    pub fn on<A, F>(method: &'static str, handler: F) -> Self
    where
        A: Any,
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            method,
            auto_register: true,
            args: Some((TypeId::of::<A>(), type_name::<A>())),
            named: None,
            handler: typed_handler(handler),
        }
    }

    /// Binds `handler` to `owner.name`; the argument type is still tried
    /// first and checked against the named event.
    pub fn named<A, F>(method: &'static str, owner: &'static str, name: &'static str, handler: F) -> Self
    where
        A: Any,
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            named: Some((owner, name)),
            ..Self::on(method, handler)
        }
    }

    /// Binds an untyped handler to `owner.name`.
    pub fn raw(
        method: &'static str,
        owner: &'static str,
        name: &'static str,
        handler: EventHandler,
    ) -> Self {
        Self {
            method,
            auto_register: true,
            args: None,
            named: Some((owner, name)),
            handler,
        }
    }

    /// Excludes the binding from automatic registration on enable.
    pub fn manual(mut self) -> Self {
        self.auto_register = false;
        self
    }

    /// Handler method name.
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Whether enabling the owner binds this handler.
    pub fn is_auto_register(&self) -> bool {
        self.auto_register
    }

    fn resolve(&self, metadata: &EventMetadata) -> BindingResult<EventDescriptor> {
        if let Some(event) = self.args.and_then(|(args, _)| metadata.by_args(args)) {
            return Ok(*event);
        }
        if let Some((owner, name)) = self.named {
            if let Some(event) = metadata.by_name(owner, name) {
                return match self.args {
                    Some((args, accepted)) if args != event.args => {
                        Err(BindingError::SignatureMismatch {
                            method: self.method.to_string(),
                            event: event.to_string(),
                            expected: accepted,
                            found: event.args_name,
                        })
                    }
                    _ => Ok(*event),
                };
            }
        }
        Err(BindingError::not_found(self.method))
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("method", &self.method)
            .field("auto_register", &self.auto_register)
            .field("args", &self.args.map(|(_, name)| name))
            .field("named", &self.named)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BindingManager
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Bound {
    event: EventDescriptor,
    handler: HandlerId,
}

/// Attaches and detaches declared handlers, tracking one binding per key.
pub struct BindingManager {
    metadata: Arc<EventMetadata>,
    bus: Arc<dyn EventBus>,
    bound: Mutex<HashMap<BindingKey, Bound>>,
    next_instance: AtomicU64,
}

impl BindingManager {
    /// Creates a manager resolving events through `metadata`.
    pub fn new(metadata: Arc<EventMetadata>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            metadata,
            bus,
            bound: Mutex::new(HashMap::new()),
            next_instance: AtomicU64::new(1),
        }
    }

    /// Allocates a fresh instance id.
    pub fn allocate_instance(&self) -> InstanceId {
        InstanceId(self.next_instance.fetch_add(1, Ordering::Relaxed))
    }

    /// The metadata bindings resolve against.
    pub fn metadata(&self) -> &Arc<EventMetadata> {
        &self.metadata
    }

    /// Binds every auto-register candidate.
    ///
    /// Returns the keys bound by this call.
    pub fn bind(
        &self,
        owner: &'static str,
        instance: Option<InstanceId>,
        candidates: impl IntoIterator<Item = EventBinding>,
    ) -> Vec<BindingKey> {
        self.bind_filtered(owner, instance, candidates, false)
    }

    /// Binds every candidate, ignoring the auto-register flag.
    pub fn bind_all(
        &self,
        owner: &'static str,
        instance: Option<InstanceId>,
        candidates: impl IntoIterator<Item = EventBinding>,
    ) -> Vec<BindingKey> {
        self.bind_filtered(owner, instance, candidates, true)
    }

    fn bind_filtered(
        &self,
        owner: &'static str,
        instance: Option<InstanceId>,
        candidates: impl IntoIterator<Item = EventBinding>,
        include_manual: bool,
    ) -> Vec<BindingKey> {
        let mut keys = Vec::new();
        for binding in candidates {
            if !include_manual && !binding.auto_register {
                continue;
            }
            let key = BindingKey {
                owner,
                method: binding.method,
                instance,
            };
            if self.bound.lock().contains_key(&key) {
                warn!(binding = %key, "Handler is already bound; ignoring");
                continue;
            }

            let attached = binding.resolve(&self.metadata).and_then(|event| {
                self.bus
                    .attach(&event, Arc::clone(&binding.handler))
                    .map(|handler| Bound { event, handler })
            });
            match attached {
                Ok(bound) => {
                    debug!(binding = %key, event = %bound.event, "Handler bound");
                    self.bound.lock().insert(key.clone(), bound);
                    keys.push(key);
                }
                Err(e) => warn!(binding = %key, error = %e, "Could not bind handler"),
            }
        }
        keys
    }

    /// Detaches one binding. Unbinding a key that is not bound does nothing.
    pub fn unbind(&self, key: &BindingKey) -> bool {
        let Some(bound) = self.bound.lock().remove(key) else {
            return false;
        };
        if !self.bus.detach(&bound.event, bound.handler) {
            debug!(binding = %key, "Handler was already detached by the host");
        }
        debug!(binding = %key, event = %bound.event, "Handler unbound");
        true
    }

    /// Detaches every binding of `owner`/`instance`.
    pub fn unbind_owner(&self, owner: &str, instance: Option<InstanceId>) -> usize {
        let keys: Vec<BindingKey> = self
            .bound
            .lock()
            .keys()
            .filter(|key| key.owner == owner && key.instance == instance)
            .cloned()
            .collect();
        keys.iter().filter(|key| self.unbind(key)).count()
    }

    /// Detaches every binding.
    pub fn unbind_everything(&self) -> usize {
        let keys: Vec<BindingKey> = self.bound.lock().keys().cloned().collect();
        keys.iter().filter(|key| self.unbind(key)).count()
    }

    /// Whether `key` is bound.
    pub fn is_bound(&self, key: &BindingKey) -> bool {
        self.bound.lock().contains_key(key)
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bound.lock().len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bound.lock().is_empty()
    }
}

impl fmt::Debug for BindingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingManager")
            .field("events", &self.metadata.len())
            .field("bound", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use banana_core::{HostEvent, LocalEventBus};
    use std::sync::atomic::AtomicUsize;
    use tracing_test::traced_test;

    struct Joined;
    impl HostEvent for Joined {
        const OWNER: &'static str = "Player";
        const NAME: &'static str = "Joined";
    }

    struct Left;
    impl HostEvent for Left {
        const OWNER: &'static str = "Player";
        const NAME: &'static str = "Left";
    }

    struct Unknown;

    fn setup() -> (Arc<LocalEventBus>, BindingManager) {
        let bus = Arc::new(LocalEventBus::new());
        bus.expose::<Joined>().expose::<Left>();
        let metadata = Arc::new(EventMetadata::from_descriptors(bus.exposed_events()));
        let manager = BindingManager::new(metadata, bus.clone());
        (bus, manager)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Joined) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        (hits, move |_: &Joined| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn binds_by_argument_type_and_unbinds() {
        let (bus, manager) = setup();
        let (hits, handler) = counter();
        let instance = manager.allocate_instance();

        let keys = manager.bind("Greeter", Some(instance), [EventBinding::on("on_joined", handler)]);
        assert_eq!(keys.len(), 1);
        bus.emit(&Joined);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(manager.unbind(&keys[0]));
        assert!(!manager.unbind(&keys[0]));
        bus.emit(&Joined);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.total_handlers(), 0);
    }

    #[test]
    #[traced_test]
    fn duplicate_bind_is_ignored() {
        let (bus, manager) = setup();
        let instance = Some(manager.allocate_instance());
        let (_, first) = counter();
        let (_, second) = counter();

        manager.bind("Greeter", instance, [EventBinding::on("on_joined", first)]);
        let again = manager.bind("Greeter", instance, [EventBinding::on("on_joined", second)]);

        assert!(again.is_empty());
        assert_eq!(bus.handler_count(&Joined::descriptor()), 1);
        assert!(logs_contain("already bound"));
    }

    #[test]
    #[traced_test]
    fn failures_skip_only_the_failing_binding() {
        let (bus, manager) = setup();
        let (hits, handler) = counter();

        let keys = manager.bind(
            "Greeter",
            None,
            [
                EventBinding::on("on_unknown", |_: &Unknown| {}),
                EventBinding::named("on_left", "Player", "Left", |_: &Unknown| {}),
                EventBinding::on("on_joined", handler),
            ],
        );

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].method, "on_joined");
        bus.emit(&Joined);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(logs_contain("no host event"));
        assert!(logs_contain("expects"));
    }

    #[test]
    fn explicit_name_resolves_untyped_handlers() {
        let (bus, manager) = setup();
        let keys = manager.bind(
            "Greeter",
            None,
            [EventBinding::raw("on_left", "Player", "Left", Arc::new(|_: &dyn Any| {}))],
        );
        assert_eq!(keys.len(), 1);
        assert_eq!(bus.handler_count(&Left::descriptor()), 1);
    }

    #[test]
    fn manual_bindings_need_bind_all() {
        let (bus, manager) = setup();
        let instance = Some(manager.allocate_instance());
        let make = || [EventBinding::on("on_joined", |_: &Joined| {}).manual()];

        assert!(manager.bind("Greeter", instance, make()).is_empty());
        assert_eq!(manager.bind_all("Greeter", instance, make()).len(), 1);
        assert_eq!(manager.unbind_owner("Greeter", instance), 1);
        assert_eq!(bus.total_handlers(), 0);
        assert!(manager.is_empty());
    }
}
