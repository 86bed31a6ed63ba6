//! Error types shared across the Banana crates.

use thiserror::Error;

/// Errors raised while wiring a handler to a host event.
///
/// Binding errors are never fatal: the binding manager logs them and moves
/// on to the next candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    /// Neither the argument type nor the explicit name matched a host event.
    #[error("no host event found for handler '{method}'")]
    EventNotFound {
        /// Handler (method) identity.
        method: String,
    },

    /// The event was found by name but carries a different argument type.
    #[error("handler '{method}' expects '{expected}' but event '{event}' carries '{found}'")]
    SignatureMismatch {
        /// Handler (method) identity.
        method: String,
        /// Qualified event name.
        event: String,
        /// Argument type the handler accepts.
        expected: &'static str,
        /// Argument type the event carries.
        found: &'static str,
    },

    /// The event bus refused the handler.
    #[error("event bus rejected handler for '{event}': {reason}")]
    Rejected {
        /// Qualified event name.
        event: String,
        /// Reason given by the bus.
        reason: String,
    },
}

impl BindingError {
    /// Creates an [`EventNotFound`](Self::EventNotFound) error.
    pub fn not_found(method: impl Into<String>) -> Self {
        Self::EventNotFound {
            method: method.into(),
        }
    }

    /// Creates a [`Rejected`](Self::Rejected) error.
    pub fn rejected(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            event: event.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

/// Errors raised while converting a raw config value to a property's type.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The raw value has the wrong shape for the target type.
    #[error("cannot convert {found} value to {expected}")]
    Mismatch {
        /// Target type, rendered from its tag.
        expected: String,
        /// Kind of the raw value (`string`, `mapping`, ...).
        found: &'static str,
    },

    /// An enum value named a variant that does not exist.
    #[error("'{value}' is not a variant of {name}")]
    UnknownVariant {
        /// Enum type name.
        name: &'static str,
        /// Offending raw value.
        value: String,
    },

    /// No converter is registered for the target type.
    #[error("no conversion registered for type '{0}'")]
    Unsupported(String),

    /// The target has no configurable property with that key.
    #[error("no configurable property named '{0}'")]
    UnknownProperty(String),

    /// The converted value could not be assigned to the field.
    #[error("failed to assign value: {0}")]
    Assign(#[from] serde_yaml::Error),
}

impl ConvertError {
    /// Creates a [`Mismatch`](Self::Mismatch) error.
    pub fn mismatch(expected: impl ToString, found: &'static str) -> Self {
        Self::Mismatch {
            expected: expected.to_string(),
            found,
        }
    }
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;
