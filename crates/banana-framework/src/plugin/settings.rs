use serde::{Deserialize, Serialize};

/// Plugin-level settings, persisted as `BananaSettings.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    /// A disabled plugin is skipped at load.
    pub is_enabled: bool,
    /// Raises the plugin's log level to `debug`.
    pub debug: bool,
    /// Id of the server this process runs as; empty falls back to the
    /// library setting, then to port matching.
    pub current_banana_server_id: String,
    /// Prefix carried by the plugin's log span.
    pub logger_prefix: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            is_enabled: true,
            debug: false,
            current_banana_server_id: String::new(),
            logger_prefix: "BP".to_string(),
        }
    }
}

impl PluginSettings {
    /// The configured server id, if any.
    pub fn server_id(&self) -> Option<&str> {
        let id = self.current_banana_server_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let settings: PluginSettings = serde_yaml::from_str("debug: true\n").unwrap();
        assert!(settings.is_enabled);
        assert!(settings.debug);
        assert_eq!(settings.logger_prefix, "BP");
        assert_eq!(settings.server_id(), None);

        let settings = PluginSettings {
            current_banana_server_id: " us1 ".into(),
            ..Default::default()
        };
        assert_eq!(settings.server_id(), Some("us1"));
    }
}
