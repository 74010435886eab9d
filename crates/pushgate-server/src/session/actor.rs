//! Per-connection session actor.
//!
//! Each [`PushActor`] owns one worker task that multiplexes four sources:
//!
//! 1. the close signal raised by [`SessionActor::destroy`]
//! 2. the outbound heartbeat timer
//! 3. the liveness check timer
//! 4. the bounded inbound queue fed by [`SessionActor::process_message`]
//!
//! The worker is the only mutator of session state. A missed liveness check
//! moves the actor to [`ActorState::Closing`] and force-destroys the
//! connection; the actor itself stays alive until `destroy` is awaited.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use parking_lot::Mutex;
use pushgate_core::{Command, ProtocolError, QueueFullError, Request, Response, SessionParams};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, interval_at};
use tracing::{debug, error, info, warn};

use crate::adapter::{ConnectionAdapter, Frame, send_response};
use crate::config::ActorConfig;
use crate::metrics::{SESSION_HEARTBEAT_TIMEOUTS_TOTAL, SESSION_PROTOCOL_ERRORS_TOTAL};

/// Lifecycle of a session actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorState {
    /// Processing traffic.
    Running,
    /// Liveness lost; inbound traffic and heartbeats are suppressed.
    Closing,
    /// Worker exited. Terminal.
    Closed,
}

/// What the registry and lifecycle layers need from a session.
#[async_trait]
pub trait SessionActor: Send + Sync {
    /// Session id (the connection id).
    fn session_id(&self) -> &str;

    /// Owning user.
    fn user_id(&self) -> &str;

    /// Enqueue an inbound frame without blocking.
    fn process_message(&self, frame: Frame) -> Result<(), QueueFullError>;

    /// Stop the worker and wait for it to exit. Idempotent.
    async fn destroy(&self);

    /// Close the connection gracefully, then destroy. Used on eviction.
    async fn release_resources(&self);
}

/// The heartbeat-driven session actor.
pub struct PushActor {
    params: SessionParams,
    capacity: usize,
    inbox: mpsc::Sender<Frame>,
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    adapter: Mutex<Option<Arc<dyn ConnectionAdapter>>>,
    state: Arc<watch::Sender<ActorState>>,
}

impl PushActor {
    /// Send the heartbeat configuration to the peer and start the worker.
    pub fn spawn(
        adapter: Arc<dyn ConnectionAdapter>,
        params: SessionParams,
        config: ActorConfig,
    ) -> Arc<Self> {
        let capacity = config.queue_capacity.max(1);
        let (inbox, inbox_rx) = mpsc::channel(capacity);
        let (close_tx, close_rx) = oneshot::channel();
        let (state, _) = watch::channel(ActorState::Running);
        let state = Arc::new(state);

        let _ = send_response(
            adapter.as_ref(),
            &Response::heartbeat_config(config.heartbeat_send.as_secs()),
        );

        let worker = Worker {
            session_id: params.session_id.clone(),
            adapter: adapter.clone(),
            inbox: inbox_rx,
            close_rx,
            heartbeat_send: config.heartbeat_send,
            heartbeat_check: config.heartbeat_check,
            heartbeat_received: false,
            closing: false,
            state: state.clone(),
        };
        let handle = tokio::spawn(supervise(worker));

        info!(
            session_id = %params.session_id,
            user_id = %params.user_id,
            "session actor started"
        );

        Arc::new(Self {
            params,
            capacity,
            inbox,
            close_tx: Mutex::new(Some(close_tx)),
            worker: tokio::sync::Mutex::new(Some(handle)),
            adapter: Mutex::new(Some(adapter)),
            state,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActorState {
        *self.state.borrow()
    }

    /// Resolved session parameters.
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Inbound queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl SessionActor for PushActor {
    fn session_id(&self) -> &str {
        &self.params.session_id
    }

    fn user_id(&self) -> &str {
        &self.params.user_id
    }

    fn process_message(&self, frame: Frame) -> Result<(), QueueFullError> {
        match self.inbox.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(
                    session_id = %self.params.session_id,
                    capacity = self.capacity,
                    "inbound queue full"
                );
                Err(QueueFullError {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                debug!(session_id = %self.params.session_id, "session stopped, dropping frame");
                Ok(())
            }
        }
    }

    async fn destroy(&self) {
        let close_tx = self.close_tx.lock().take();
        if let Some(tx) = close_tx {
            let _ = tx.send(());
        }

        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                error!(session_id = %self.params.session_id, error = %e, "session worker did not exit cleanly");
            }
            let _ = self.state.send_replace(ActorState::Closed);
            let _ = self.adapter.lock().take();
            info!(session_id = %self.params.session_id, "session actor destroyed");
        }
    }

    async fn release_resources(&self) {
        let adapter = self.adapter.lock().clone();
        if let Some(adapter) = adapter {
            adapter.close();
        }
        self.destroy().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

struct Worker {
    session_id: String,
    adapter: Arc<dyn ConnectionAdapter>,
    inbox: mpsc::Receiver<Frame>,
    close_rx: oneshot::Receiver<()>,
    heartbeat_send: Duration,
    heartbeat_check: Duration,
    heartbeat_received: bool,
    closing: bool,
    state: Arc<watch::Sender<ActorState>>,
}

/// Run the worker, containing any panic to this session.
async fn supervise(worker: Worker) {
    let session_id = worker.session_id.clone();
    let adapter = worker.adapter.clone();
    let state = worker.state.clone();

    if let Err(payload) = AssertUnwindSafe(worker.run()).catch_unwind().await {
        error!(
            session_id = %session_id,
            panic = panic_message(&*payload),
            "session worker panicked"
        );
        adapter.destroy();
        let _ = state.send_replace(ActorState::Closed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn timer(period: Duration) -> Interval {
    interval_at(Instant::now() + period, period)
}

impl Worker {
    async fn run(mut self) {
        let mut send_tick = timer(self.heartbeat_send);
        let mut check_tick = timer(self.heartbeat_check);

        loop {
            tokio::select! {
                biased;
                _ = &mut self.close_rx => break,
                _ = send_tick.tick() => self.push_heartbeat(),
                _ = check_tick.tick() => self.on_check_tick(),
                Some(frame) = self.inbox.recv() => self.handle_frame(frame),
            }
        }

        let _ = self.state.send_replace(ActorState::Closed);
        debug!(session_id = %self.session_id, "session worker exited");
    }

    fn push_heartbeat(&self) {
        if !self.closing {
            let _ = send_response(self.adapter.as_ref(), &Response::heartbeat());
        }
    }

    /// Consume frames that are already queued, then check liveness, so a
    /// heartbeat that arrived with the tick still counts.
    fn on_check_tick(&mut self) {
        while let Ok(frame) = self.inbox.try_recv() {
            self.handle_frame(frame);
        }
        self.check_liveness();
    }

    fn check_liveness(&mut self) {
        if self.heartbeat_received {
            self.heartbeat_received = false;
            return;
        }
        if self.closing {
            return;
        }
        warn!(
            session_id = %self.session_id,
            timeout_secs = self.heartbeat_check.as_secs(),
            "no heartbeat within liveness interval, dropping connection"
        );
        counter!(SESSION_HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
        self.closing = true;
        let _ = self.state.send_replace(ActorState::Closing);
        self.adapter.destroy();
    }

    fn handle_frame(&mut self, frame: Frame) {
        if self.closing {
            debug!(session_id = %self.session_id, "session closing, dropping frame");
            return;
        }
        match frame {
            Frame::Text(text) => {
                if let Err(e) = self.dispatch(&text) {
                    warn!(session_id = %self.session_id, error = %e, "dropping request");
                    counter!(SESSION_PROTOCOL_ERRORS_TOTAL).increment(1);
                }
            }
            Frame::Binary(data) => {
                debug!(session_id = %self.session_id, len = data.len(), "ignoring binary frame");
            }
        }
    }

    fn dispatch(&mut self, text: &str) -> Result<(), ProtocolError> {
        let request = Request::decode(text)?;
        match request.command()? {
            Command::Heartbeat => self.heartbeat_received = true,
            Command::Subscribe => {
                info!(session_id = %self.session_id, topic = %request.topic, "subscribed");
                let _ = send_response(self.adapter.as_ref(), &Response::subscribed(&request));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
