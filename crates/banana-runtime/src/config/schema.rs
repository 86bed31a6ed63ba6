//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Library-level settings, persisted as `Banana.yml` at the config root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// A disabled library loads no plugin.
    pub is_enabled: bool,
    /// Raises the framework's own targets to `debug`.
    pub debug: bool,
    /// Server id used by plugins whose own settings leave it empty.
    pub current_banana_server_id: String,
    /// Pause before each feature of the first activation pass.
    pub activation_delay_ms: u64,
    /// Activation stages slower than this are logged.
    pub slow_activation_ms: u64,
    /// Logging setup.
    pub logging: LoggingConfig,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            is_enabled: true,
            debug: false,
            current_banana_server_id: String::new(),
            activation_delay_ms: 250,
            slow_activation_ms: 1000,
            logging: LoggingConfig::default(),
        }
    }
}

impl LibrarySettings {
    /// The activation delay as a [`Duration`].
    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }

    /// The slow-stage threshold as a [`Duration`].
    pub fn slow_activation(&self) -> Duration {
        Duration::from_millis(self.slow_activation_ms)
    }

    /// The configured fallback server id, if any.
    pub fn server_id(&self) -> Option<&str> {
        let id = self.current_banana_server_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level.
    pub level: LogLevel,
    /// Line format.
    pub format: LogFormat,
    /// Destination.
    pub output: LogOutput,
    /// Log file, when `output` is `file`.
    pub file_path: Option<PathBuf>,
    /// Log file rotation.
    pub rotation: LogRotation,
    /// Per-target levels, e.g. `banana_framework: debug`.
    pub filters: BTreeMap<String, LogLevel>,
    /// Include thread ids.
    pub thread_ids: bool,
    /// Include file names and line numbers.
    pub file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::new(),
            thread_ids: false,
            file_location: false,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// `trace`
    Trace,
    /// `debug`
    Debug,
    /// `info`
    #[default]
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The matching [`tracing::Level`].
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single line, abbreviated.
    #[default]
    Compact,
    /// Single line with every field.
    Full,
    /// Multi-line, for development.
    Pretty,
    /// JSON lines (needs the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// The file at `file_path`.
    File,
}

/// Log file rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// One file, never rotated.
    #[default]
    Never,
    /// A new file every day.
    Daily,
    /// A new file every hour.
    Hourly,
}
