//! Host identity and lifecycle signal.

use linkme::distributed_slice;

use crate::foundation::event::{HOST_EVENTS, HostEvent, HostEventFn};

/// Facts about the running host process.
pub trait HostInfo: Send + Sync {
    /// Port the game server listens on.
    fn server_port(&self) -> u16;
}

/// A [`HostInfo`] with fixed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHost {
    /// Listening port.
    pub port: u16,
}

impl StaticHost {
    /// Creates a host listening on `port`.
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

impl HostInfo for StaticHost {
    fn server_port(&self) -> u16 {
        self.port
    }
}

/// The host's "ready" signal: the world is loaded and waiting for players.
///
/// It triggers role composition and the first feature activation batch.
/// Hosts may fire it once per round; the runtime only reacts to the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerReady;

impl HostEvent for ServerReady {
    const OWNER: &'static str = "Server";
    const NAME: &'static str = "WaitingForPlayers";
}

#[distributed_slice(HOST_EVENTS)]
static SERVER_READY_EVENT: HostEventFn = <ServerReady as HostEvent>::descriptor;
