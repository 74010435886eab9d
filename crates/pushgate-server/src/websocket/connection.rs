//! Socket-backed [`ConnectionAdapter`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::{ConnectionAdapter, ConnectionInfo, Frame, SessionBinding};

/// Outbound channel depth per connection.
pub const OUTBOUND_BUFFER: usize = 256;

/// Work item for the connection's writer task.
#[derive(Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Write a frame.
    Frame(Frame),
    /// Write a close frame and stop.
    Close,
}

/// A connected WebSocket peer.
///
/// Frames go through a bounded channel to the writer task. `destroy` cancels
/// the connection token, which stops both halves of the socket.
pub struct WsConnection {
    id: String,
    info: ConnectionInfo,
    tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    binding: Mutex<Option<SessionBinding>>,
    connected_at: Instant,
    dropped_frames: AtomicU64,
}

impl WsConnection {
    /// Create a connection and the receiver its writer task drains.
    pub fn new(
        id: String,
        info: ConnectionInfo,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let conn = Self {
            id,
            info,
            tx,
            cancel,
            binding: Mutex::new(None),
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        };
        (conn, rx)
    }

    /// Token cancelled when the connection must stop.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Frames dropped because the outbound channel was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl ConnectionAdapter for WsConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn send(&self, frame: Frame) -> bool {
        if self.tx.try_send(Outbound::Frame(frame)).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    fn close(&self) {
        if self.tx.try_send(Outbound::Close).is_err() {
            debug!(conn_id = %self.id, "outbound channel unavailable, cancelling instead");
            self.cancel.cancel();
        }
    }

    fn destroy(&self) {
        self.cancel.cancel();
    }

    fn attach(&self, binding: SessionBinding) {
        *self.binding.lock() = Some(binding);
    }

    fn binding(&self) -> Option<SessionBinding> {
        self.binding.lock().clone()
    }

    fn detach(&self) -> Option<SessionBinding> {
        self.binding.lock().take()
    }
}
