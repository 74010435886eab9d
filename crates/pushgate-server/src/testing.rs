//! In-memory [`ConnectionAdapter`] for exercising session logic without a
//! socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pushgate_core::{Response, ResponseType};

use crate::adapter::{ConnectionAdapter, ConnectionInfo, Frame, SessionBinding};

/// Records every frame sent and every close/destroy request.
pub struct RecordingAdapter {
    id: String,
    info: ConnectionInfo,
    sent: Mutex<Vec<Frame>>,
    closes: AtomicUsize,
    destroys: AtomicUsize,
    binding: Mutex<Option<SessionBinding>>,
}

impl RecordingAdapter {
    /// An adapter with no cookie and an empty URL.
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Self::with_info(id, ConnectionInfo::default())
    }

    /// An adapter that presents the given connection metadata.
    pub fn with_info(id: impl Into<String>, info: ConnectionInfo) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            info,
            sent: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            binding: Mutex::new(None),
        })
    }

    /// An adapter whose URL carries `?token=<token>`.
    pub fn with_url_token(id: impl Into<String>, token: &str) -> Arc<Self> {
        Self::with_info(
            id,
            ConnectionInfo {
                cookie: String::new(),
                url: format!("/ws?token={token}"),
            },
        )
    }

    /// Every frame sent so far.
    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    /// Text frames decoded as responses. Undecodable frames are skipped.
    pub fn responses(&self) -> Vec<Response> {
        self.sent
            .lock()
            .iter()
            .filter_map(|f| match f {
                Frame::Text(t) => serde_json::from_str(t).ok(),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Number of sent responses of the given type.
    pub fn count_of(&self, response_type: ResponseType) -> usize {
        self.responses()
            .iter()
            .filter(|r| r.response_type == response_type)
            .count()
    }

    /// Times `close` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Times `destroy` was called.
    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }
}

impl ConnectionAdapter for RecordingAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn send(&self, frame: Frame) -> bool {
        self.sent.lock().push(frame);
        true
    }

    fn close(&self) {
        let _ = self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        let _ = self.destroys.fetch_add(1, Ordering::SeqCst);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_sends_closes_and_destroys() {
        let adapter = RecordingAdapter::new("c1");
        assert!(adapter.send(Frame::Text(Response::heartbeat().to_json().unwrap())));
        assert!(adapter.send(Frame::Binary(vec![1, 2])));
        adapter.close();
        adapter.destroy();
        adapter.destroy();

        assert_eq!(adapter.sent().len(), 2);
        assert_eq!(adapter.count_of(ResponseType::Heartbeat), 1);
        assert_eq!(adapter.close_count(), 1);
        assert_eq!(adapter.destroy_count(), 2);
    }

    #[test]
    fn url_token_info() {
        let adapter = RecordingAdapter::with_url_token("c1", "abc");
        assert_eq!(adapter.id(), "c1");
        assert_eq!(adapter.info().url, "/ws?token=abc");
        assert!(adapter.info().cookie.is_empty());
        assert!(adapter.binding().is_none());
    }
}
