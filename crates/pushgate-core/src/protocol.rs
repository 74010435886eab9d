//! Wire-format envelopes exchanged with a connected peer.
//!
//! Requests arrive as JSON text frames; responses are serialized with every
//! field present so clients can rely on a fixed shape.

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// `cmd` value for a client heartbeat.
pub const CMD_HEARTBEAT: &str = "heartbeat";
/// `cmd` value for a topic subscription.
pub const CMD_SUBSCRIBE: &str = "subscribe";

/// Incoming request from a peer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Request {
    /// Command name (`heartbeat` or `subscribe`).
    pub cmd: String,
    /// Subscription topic.
    pub topic: String,
    /// Client-chosen correlation id, echoed back.
    pub request_id: String,
    /// Client sequence number, echoed back.
    pub msg_seq_id: i64,
    /// Client timestamp, echoed back.
    pub msg_timestamp: i64,
}

/// A recognized, validated request command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Peer liveness signal.
    Heartbeat,
    /// Subscribe to the request's (non-empty) topic.
    Subscribe,
}

impl Request {
    /// Decode a request from a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate the `cmd` field (and the topic for subscriptions).
    pub fn command(&self) -> Result<Command, ProtocolError> {
        match self.cmd.as_str() {
            CMD_HEARTBEAT => Ok(Command::Heartbeat),
            CMD_SUBSCRIBE if self.topic.is_empty() => Err(ProtocolError::EmptyTopic),
            CMD_SUBSCRIBE => Ok(Command::Subscribe),
            other => Err(ProtocolError::UnknownCommand(other.to_owned())),
        }
    }
}

/// Kind of a server response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseType {
    /// Sent once at connect; `rate` carries the heartbeat interval in seconds.
    HeartbeatConfig,
    /// Result of a client operation (subscribe ack, auth failure).
    #[default]
    OperationResult,
    /// Periodic keep-alive push.
    Heartbeat,
}

/// Outgoing response to a peer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Response {
    /// Response kind.
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    /// Echoed command.
    pub cmd: String,
    /// Echoed topic.
    pub topic: String,
    /// Echoed request id.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure description (empty on success).
    pub err_msg: String,
    /// Echoed sequence number.
    pub msg_seq_id: i64,
    /// Echoed timestamp.
    pub msg_timestamp: i64,
    /// Heartbeat rate in seconds (`heartbeat-config` only).
    pub rate: u64,
}

impl Response {
    /// The initial heartbeat configuration push.
    pub fn heartbeat_config(rate_secs: u64) -> Self {
        Self {
            response_type: ResponseType::HeartbeatConfig,
            success: true,
            rate: rate_secs,
            ..Self::default()
        }
    }

    /// A periodic keep-alive push.
    pub fn heartbeat() -> Self {
        Self {
            response_type: ResponseType::Heartbeat,
            ..Self::default()
        }
    }

    /// Acknowledge a subscribe request, echoing its correlation fields.
    pub fn subscribed(req: &Request) -> Self {
        Self {
            response_type: ResponseType::OperationResult,
            cmd: req.cmd.clone(),
            topic: req.topic.clone(),
            request_id: req.request_id.clone(),
            success: true,
            msg_seq_id: req.msg_seq_id,
            msg_timestamp: req.msg_timestamp,
            ..Self::default()
        }
    }

    /// Reject an operation with a message.
    pub fn failure(err_msg: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::OperationResult,
            success: false,
            err_msg: err_msg.into(),
            ..Self::default()
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
