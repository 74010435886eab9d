//! Runtime configuration derived from [`PushgateSettings`].

use std::time::Duration;

use pushgate_settings::{PushgateSettings, SessionSettings};

/// Per-session timing and queue limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorConfig {
    /// Outbound heartbeat period.
    pub heartbeat_send: Duration,
    /// Liveness check period.
    pub heartbeat_check: Duration,
    /// Inbound queue capacity.
    pub queue_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for ActorConfig {
    fn from(s: &SessionSettings) -> Self {
        Self {
            heartbeat_send: Duration::from_secs(s.heartbeat_send_secs),
            heartbeat_check: Duration::from_secs(s.heartbeat_check_secs),
            queue_capacity: s.inbound_queue_capacity,
        }
    }
}

/// Configuration for [`PushServer`](crate::server::PushServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Cookie carrying the auth token.
    pub cookie_name: String,
    /// Session actor limits.
    pub actor: ActorConfig,
    /// How long shutdown waits for the serve task.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&PushgateSettings::default())
    }
}

impl From<&PushgateSettings> for ServerConfig {
    fn from(s: &PushgateSettings) -> Self {
        Self {
            host: s.server.host.clone(),
            port: s.server.port,
            max_message_size: s.server.max_message_size,
            cookie_name: s.auth.cookie_name.clone(),
            actor: ActorConfig::from(&s.session),
            shutdown_timeout: Duration::from_secs(s.server.shutdown_timeout_secs),
        }
    }
}
