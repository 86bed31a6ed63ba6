//! Error types for the Banana framework.

use thiserror::Error;

/// Error returned by plugin-supplied hooks (feature activation, plugin
/// enable/disable, factories).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a single feature's lifecycle transition.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The feature's activation hook failed. Bindings made for the
    /// transition have already been rolled back.
    #[error("feature '{feature}' could not be enabled: {source}")]
    Activation {
        /// Feature name.
        feature: String,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// No feature with this name is loaded.
    #[error("feature '{0}' not found")]
    NotFound(String),
}

impl FeatureError {
    /// Wraps a hook failure for `feature`.
    pub fn activation(feature: impl Into<String>, source: BoxError) -> Self {
        Self::Activation {
            feature: feature.into(),
            source,
        }
    }
}

/// Result type for feature lifecycle operations.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Errors raised while materializing declared types.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A feature factory failed.
    #[error("could not construct feature type '{type_name}': {source}")]
    Construct {
        /// Declared type name.
        type_name: &'static str,
        /// Error returned by the factory.
        #[source]
        source: BoxError,
    },
}

/// Primary server resolution failure.
///
/// This is the only framework error that reaches a plugin's init path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Servers are declared but none matches the configured id or the port.
    #[error("no declared server matches id '{configured_id}' or port {port}")]
    NoPrimary {
        /// Configured server id (may be empty).
        configured_id: String,
        /// Port the host listens on.
        port: u16,
    },
}
