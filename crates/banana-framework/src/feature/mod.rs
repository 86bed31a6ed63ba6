//! Feature lifecycle.
//!
//! A feature is a unit of plugin functionality that can be switched on and
//! off at runtime. Each plugin declares its feature types; discovery builds
//! one [`FeatureInstance`] per declaration, hydrates its configuration, and
//! the activation pass enables the ones whose `should_enable` is set.
//!
//! # State machine
//!
//! ```text
//!  Constructed ──▶ (config loaded) ──▶ Disabled ⇄ Enabled ──▶ torn down
//! ```
//!
//! Setting the enabled flag to its current value is a no-op. Enabling binds
//! the feature's event handlers and then runs [`Feature::enable`]; disabling
//! unbinds and then runs [`Feature::disable`].
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Default, BananaConfig)]
//! pub struct Greeter {
//!     #[banana(config)]
//!     pub message: String,
//! }
//!
//! impl Feature for Greeter {
//!     fn name(&self) -> &str {
//!         "Greeter"
//!     }
//!
//!     fn enable(&mut self) -> Result<(), BoxError> {
//!         info!(message = %self.message, "Greeter ready");
//!         Ok(())
//!     }
//!
//!     fn disable(&mut self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//!
//!     fn server_targets() -> Vec<ServerTarget> {
//!         vec![ServerTarget::disabled_by_default(), ServerTarget::enabled_on("Main")]
//!     }
//! }
//! ```

mod collection;
mod instance;
mod manager;

pub use collection::{FeatureCollection, HydrateOutcome};
pub use instance::{FeatureInstance, SHOULD_ENABLE_KEY};
pub use manager::{ActivationReport, DEFAULT_ACTIVATION_DELAY, DEFAULT_SLOW_ACTIVATION, FeatureManager};

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::binding::EventBinding;
use crate::config::Configurable;
use crate::error::{BoxError, DiscoveryError};
use crate::server::ServerTarget;

// ============================================================================
// Feature
// ============================================================================

/// Dynamic access to the concrete feature type.
pub trait AsAny: Any {
    /// `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;
    /// `self` as mutable [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A switchable unit of plugin functionality.
pub trait Feature: AsAny + Configurable + Send + Sync {
    /// Display name; also the key of the feature's config section.
    fn name(&self) -> &str;

    /// Activation hook, run after event handlers are bound.
    fn enable(&mut self) -> Result<(), BoxError>;

    /// Deactivation hook, run after event handlers are unbound.
    fn disable(&mut self) -> Result<(), BoxError>;

    /// Handlers bound while the feature is enabled.
    fn event_bindings(&self) -> Vec<EventBinding> {
        Vec::new()
    }

    /// Called once the persisted config section has been applied.
    fn config_loaded(&mut self) {}

    /// Default-enabled rules, evaluated in order.
    fn server_targets() -> Vec<ServerTarget>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

// ============================================================================
// FeatureDeclaration
// ============================================================================

/// Builds a feature instance.
pub type FeatureFactory = Arc<dyn Fn() -> Result<Box<dyn Feature>, BoxError> + Send + Sync>;

/// A feature type declared by a plugin.
#[derive(Clone)]
pub struct FeatureDeclaration {
    type_name: &'static str,
    factory: FeatureFactory,
    targets: Vec<ServerTarget>,
    obsolete: bool,
}

impl FeatureDeclaration {
    /// Declares `F`, constructed through [`Default`].
    pub fn of<F: Feature + Default>() -> Self {
        Self {
            type_name: type_name::<F>(),
            factory: Arc::new(|| Ok(Box::new(F::default()) as Box<dyn Feature>)),
            targets: F::server_targets(),
            obsolete: false,
        }
    }

    /// Declares `F`, constructed by `factory`.
    pub fn with_factory<F, C>(factory: C) -> Self
    where
        F: Feature,
        C: Fn() -> Result<F, BoxError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<F>(),
            factory: Arc::new(move || factory().map(|f| Box::new(f) as Box<dyn Feature>)),
            targets: F::server_targets(),
            obsolete: false,
        }
    }

    /// Appends a default-enabled rule after the type's own rules.
    pub fn target(mut self, target: ServerTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Marks the declaration obsolete; discovery skips it.
    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }

    /// Declared type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Default-enabled rules.
    pub fn server_targets(&self) -> &[ServerTarget] {
        &self.targets
    }

    /// Whether discovery skips this declaration.
    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    /// Runs the factory.
    pub fn construct(&self) -> Result<Box<dyn Feature>, DiscoveryError> {
        (self.factory)().map_err(|source| DiscoveryError::Construct {
            type_name: self.type_name,
            source,
        })
    }
}

impl fmt::Debug for FeatureDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDeclaration")
            .field("type_name", &self.type_name)
            .field("targets", &self.targets)
            .field("obsolete", &self.obsolete)
            .finish_non_exhaustive()
    }
}
