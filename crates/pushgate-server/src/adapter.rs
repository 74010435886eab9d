//! The transport boundary a session actor talks to.

use std::sync::Arc;

use pushgate_core::Response;
use tracing::error;

use crate::session::actor::SessionActor;

/// A single frame on the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

/// Metadata captured when the connection was accepted.
#[derive(Clone, Debug, Default)]
pub struct ConnectionInfo {
    /// Value of the auth cookie (empty if absent).
    pub cookie: String,
    /// Request target the peer connected to, e.g. `/ws?token=abc`.
    pub url: String,
}

/// Per-connection state attached once a session is established.
#[derive(Clone)]
pub struct SessionBinding {
    /// The connection's session actor.
    pub actor: Arc<dyn SessionActor>,
    /// Resolved user identity.
    pub user_id: String,
}

/// Capabilities the session layer needs from a connection.
///
/// `close` and `destroy` must not block: the session worker calls `destroy`
/// from inside its own loop.
pub trait ConnectionAdapter: Send + Sync {
    /// Unique connection id; doubles as the session id.
    fn id(&self) -> &str;

    /// Metadata captured at accept time.
    fn info(&self) -> &ConnectionInfo;

    /// Queue a frame for the peer. Returns `false` if it could not be queued.
    fn send(&self, frame: Frame) -> bool;

    /// Close gracefully after already-queued frames are flushed.
    fn close(&self);

    /// Drop the connection immediately.
    fn destroy(&self);

    /// Attach session state.
    fn attach(&self, binding: SessionBinding);

    /// Currently attached session state.
    fn binding(&self) -> Option<SessionBinding>;

    /// Remove and return the attached session state.
    fn detach(&self) -> Option<SessionBinding>;
}

/// Serialize a response and send it as a text frame.
pub fn send_response(adapter: &dyn ConnectionAdapter, response: &Response) -> bool {
    match response.to_json() {
        Ok(json) => adapter.send(Frame::Text(json)),
        Err(e) => {
            error!(conn_id = adapter.id(), error = %e, "failed to serialize response");
            false
        }
    }
}
