//! Server profiles and per-server feature targeting.
//!
//! A plugin may declare the servers it is deployed to. At load time exactly
//! one of them becomes the *primary* profile: the configured server id is
//! tried first, then the host's listening port.
//!
//! ```rust,ignore
//! pub static EU_MAIN: ServerProfile = ServerProfile::new("Main", "EU Main", "eu1", 7777);
//! pub static US_MAIN: ServerProfile = ServerProfile::new("Main", "US Main", "us1", 8888);
//! ```

use std::borrow::Cow;
use std::fmt;

use tracing::{debug, error, info};

use crate::error::ServerError;

// ============================================================================
// ServerProfile
// ============================================================================

/// Identity of one deployable server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerProfile {
    /// Server type, shared by every instance of the same kind of server.
    pub kind: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Unique server id, matched against `current_banana_server_id`.
    pub id: &'static str,
    /// Listening port, matched when no id is configured.
    pub port: u16,
    /// Obsolete profiles are skipped by discovery.
    pub obsolete: bool,
}

impl ServerProfile {
    /// Declares a server profile.
    pub const fn new(kind: &'static str, name: &'static str, id: &'static str, port: u16) -> Self {
        Self {
            kind,
            name,
            id,
            port,
            obsolete: false,
        }
    }

    /// Marks the profile obsolete.
    pub const fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }
}

impl fmt::Display for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.id, self.port)
    }
}

// ============================================================================
// ServerTarget
// ============================================================================

/// A feature's default-enabled rule, optionally scoped to a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTarget {
    /// Applies on every server.
    Global(bool),
    /// Applies when the primary profile has this server type.
    ByType(&'static str, bool),
    /// Applies when the primary profile has this server id.
    ById(Cow<'static, str>, bool),
}

impl ServerTarget {
    /// Global rule: disabled unless another rule says otherwise.
    pub const fn disabled_by_default() -> Self {
        Self::Global(false)
    }

    /// Enabled on servers of type `kind`.
    pub const fn enabled_on(kind: &'static str) -> Self {
        Self::ByType(kind, true)
    }

    /// Disabled on servers of type `kind`.
    pub const fn disabled_on(kind: &'static str) -> Self {
        Self::ByType(kind, false)
    }

    /// Enabled on the server with this id.
    pub fn enabled_on_id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::ById(id.into(), true)
    }

    /// Disabled on the server with this id.
    pub fn disabled_on_id(id: impl Into<Cow<'static, str>>) -> Self {
        Self::ById(id.into(), false)
    }

    /// The enabled value this rule assigns.
    pub fn default_enabled(&self) -> bool {
        match self {
            Self::Global(enabled) | Self::ByType(_, enabled) | Self::ById(_, enabled) => *enabled,
        }
    }

    /// Whether this rule applies under `primary`.
    ///
    /// Server-scoped rules never apply when no primary profile is resolved.
    pub fn applies_to(&self, primary: Option<&ServerProfile>) -> bool {
        match (self, primary) {
            (Self::Global(_), _) => true,
            (Self::ByType(kind, _), Some(profile)) => profile.kind == *kind,
            (Self::ById(id, _), Some(profile)) => profile.id == id.as_ref(),
            (_, None) => false,
        }
    }
}

/// Resolves a feature's default-enabled value.
///
/// Starts at `true`; every applicable rule, in declaration order, overwrites
/// the result (last applicable wins).
pub fn resolve_default_enabled(targets: &[ServerTarget], primary: Option<&ServerProfile>) -> bool {
    targets
        .iter()
        .filter(|target| target.applies_to(primary))
        .fold(true, |_, target| target.default_enabled())
}

// ============================================================================
// ServerProfileCollection
// ============================================================================

/// How the primary profile was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryMatch {
    /// Matched the configured server id.
    Config,
    /// Matched the host's listening port.
    Port,
}

/// A plugin's declared servers and its resolved primary profile.
#[derive(Debug, Clone, Default)]
pub struct ServerProfileCollection {
    servers: Vec<ServerProfile>,
    primary: Option<(usize, PrimaryMatch)>,
}

impl ServerProfileCollection {
    /// Resolves the primary profile among `servers`.
    ///
    /// A non-empty `configured_id` is matched first, then `port`. An empty
    /// server list is valid and yields no primary profile. Declared servers
    /// with no match are an error.
    pub fn resolve(
        servers: Vec<ServerProfile>,
        configured_id: &str,
        port: u16,
    ) -> Result<Self, ServerError> {
        if servers.is_empty() {
            debug!("No servers declared");
            return Ok(Self::default());
        }

        let by_id = (!configured_id.is_empty())
            .then(|| servers.iter().position(|s| s.id == configured_id))
            .flatten()
            .map(|index| (index, PrimaryMatch::Config));
        let found = by_id.or_else(|| {
            servers
                .iter()
                .position(|s| s.port == port)
                .map(|index| (index, PrimaryMatch::Port))
        });

        match found {
            Some((index, via)) => {
                let profile = &servers[index];
                match via {
                    PrimaryMatch::Config => {
                        info!(server = %profile.name, id = profile.id, "Found server via config")
                    }
                    PrimaryMatch::Port => {
                        info!(server = %profile.name, port = profile.port, "Found server via port")
                    }
                }
                Ok(Self {
                    servers,
                    primary: Some((index, via)),
                })
            }
            None => {
                error!(
                    configured_id,
                    port,
                    declared = servers.len(),
                    "Could not find the current server"
                );
                Err(ServerError::NoPrimary {
                    configured_id: configured_id.to_string(),
                    port,
                })
            }
        }
    }

    /// Keeps `servers` without a primary profile; used after a failed
    /// resolution so lookups still work.
    pub fn unresolved(servers: Vec<ServerProfile>) -> Self {
        Self {
            servers,
            primary: None,
        }
    }

    /// The primary profile, if resolved.
    pub fn primary(&self) -> Option<&ServerProfile> {
        self.primary.map(|(index, _)| &self.servers[index])
    }

    /// How the primary profile was matched.
    pub fn matched_by(&self) -> Option<PrimaryMatch> {
        self.primary.map(|(_, via)| via)
    }

    /// Looks a server up by id.
    pub fn get(&self, id: &str) -> Option<&ServerProfile> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// Every server of type `kind`.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ServerProfile> + 'a {
        self.servers.iter().filter(move |s| s.kind == kind)
    }

    /// Iterates servers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServerProfile> {
        self.servers.iter()
    }

    /// Number of declared servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns `true` if no server is declared.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EU: ServerProfile = ServerProfile::new("Main", "EU", "eu1", 7777);
    const US: ServerProfile = ServerProfile::new("Main", "US", "us1", 8888);
    const EVENT: ServerProfile = ServerProfile::new("Event", "Events", "ev1", 9999);

    #[test]
    fn configured_id_beats_port() {
        let servers = ServerProfileCollection::resolve(vec![EU, US], "us1", 7777).unwrap();
        assert_eq!(servers.primary().map(|s| s.id), Some("us1"));
        assert_eq!(servers.matched_by(), Some(PrimaryMatch::Config));
    }

    #[test]
    fn falls_back_to_port() {
        let servers = ServerProfileCollection::resolve(vec![EU, US], "", 7777).unwrap();
        assert_eq!(servers.primary().map(|s| s.id), Some("eu1"));

        let servers = ServerProfileCollection::resolve(vec![EU, US], "nope", 8888).unwrap();
        assert_eq!(servers.primary().map(|s| s.id), Some("us1"));
        assert_eq!(servers.matched_by(), Some(PrimaryMatch::Port));
    }

    #[test]
    fn unmatched_declared_servers_are_an_error() {
        let err = ServerProfileCollection::resolve(vec![EU, US], "", 1234).unwrap_err();
        assert_eq!(
            err,
            ServerError::NoPrimary {
                configured_id: String::new(),
                port: 1234
            }
        );
        let empty = ServerProfileCollection::resolve(Vec::new(), "us1", 1234).unwrap();
        assert!(empty.primary().is_none());
    }

    #[test]
    fn last_applicable_target_wins() {
        let targets = vec![
            ServerTarget::disabled_by_default(),
            ServerTarget::enabled_on("Main"),
            ServerTarget::disabled_on_id("us1"),
        ];
        assert!(resolve_default_enabled(&targets, Some(&EU)));
        assert!(!resolve_default_enabled(&targets, Some(&US)));
        assert!(!resolve_default_enabled(&targets, Some(&EVENT)));
        assert!(!resolve_default_enabled(&targets, None));
        assert!(resolve_default_enabled(&[], None));
    }
}
