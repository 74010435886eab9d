//! Errors raised while handling peer traffic.

use thiserror::Error;

/// A peer frame that could not be handled.
///
/// Protocol errors are logged and the offending frame is dropped; the
/// connection stays open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not a JSON request object.
    #[error("malformed request JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    /// `cmd` was missing or not one of the recognized commands.
    #[error("unrecognized command: {0:?}")]
    UnknownCommand(String),
    /// `subscribe` without a topic.
    #[error("subscribe requires a non-empty topic")]
    EmptyTopic,
}

/// The inbound queue of a session is saturated.
///
/// Callers treat this as fatal for the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("inbound queue is full (capacity {capacity})")]
pub struct QueueFullError {
    /// Queue capacity that was exceeded.
    pub capacity: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
