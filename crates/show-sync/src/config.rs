//! Session configuration

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use show_protocol::Family;

/// Everything needed to open a session with one console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Console family
    pub family: Family,
    /// Console IP and port
    pub console: SocketAddr,
    /// Local address to bind; replies and pushes arrive here
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Eos user whose command line receives commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u32>,
    /// Override of the family's keepalive period, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_ms: Option<u64>,
    /// Re-request missing discovery replies at this interval, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_retry_ms: Option<u64>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}

impl SessionConfig {
    pub fn new(family: Family, console: SocketAddr) -> Self {
        Self {
            family,
            console,
            listen: default_listen(),
            user: None,
            keepalive_ms: None,
            discovery_retry_ms: None,
        }
    }

    /// Keepalive period, if overridden
    pub fn keepalive_period(&self) -> Option<Duration> {
        self.keepalive_ms.map(Duration::from_millis)
    }

    /// Discovery retry interval, if enabled
    pub fn discovery_retry(&self) -> Option<Duration> {
        self.discovery_retry_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
