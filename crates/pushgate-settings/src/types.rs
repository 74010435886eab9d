//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may be partial: missing fields keep their compiled default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushgateSettings {
    /// Settings schema version.
    pub version: String,
    /// Network listener settings.
    pub server: ServerSettings,
    /// Per-session timing and backpressure settings.
    pub session: SessionSettings,
    /// Token handling.
    pub auth: AuthSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for PushgateSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            session: SessionSettings::default(),
            auth: AuthSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PushgateSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.heartbeat_send_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "session.heartbeatSendSecs must be greater than zero".into(),
            ));
        }
        if self.session.heartbeat_check_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "session.heartbeatCheckSecs must be greater than zero".into(),
            ));
        }
        if self.session.inbound_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "session.inboundQueueCapacity must be greater than zero".into(),
            ));
        }
        if self.auth.cookie_name.is_empty() {
            return Err(SettingsError::InvalidValue(
                "auth.cookieName must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Network listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Largest accepted WebSocket message in bytes.
    pub max_message_size: usize,
    /// How long shutdown waits for connections to drain.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_message_size: 64 * 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Session actor timing and backpressure.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Interval between outbound heartbeat pushes.
    pub heartbeat_send_secs: u64,
    /// Interval between liveness checks; one missed check closes the session.
    pub heartbeat_check_secs: u64,
    /// Capacity of the per-session inbound queue.
    pub inbound_queue_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_send_secs: 5,
            heartbeat_check_secs: 15,
            inbound_queue_capacity: 10,
        }
    }
}

/// Identity bound to a statically configured token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenIdentity {
    /// User id.
    pub user_id: String,
    /// Group id.
    pub group_id: i64,
    /// Organisation id.
    pub org_id: i64,
    /// Organisation name.
    pub org_name: String,
}

/// Token handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Cookie that carries the token.
    pub cookie_name: String,
    /// Treat the token itself as the user id. Development only.
    pub token_as_user_id: bool,
    /// Static token table.
    pub tokens: BTreeMap<String, TokenIdentity>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            token_as_user_id: false,
            tokens: BTreeMap::new(),
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
