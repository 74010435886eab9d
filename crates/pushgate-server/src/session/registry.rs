//! Per-user session registry: at most one live session per user.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use metrics::{counter, gauge};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::actor::SessionActor;
use crate::metrics::{SESSION_EVICTIONS_TOTAL, SESSIONS_ACTIVE};

/// Maps a user id to that user's live session.
///
/// The map lock only guards map reads and writes. Registrations for the same
/// user are serialized by a per-user gate held across the eviction, so a
/// later connect cannot install itself while an earlier one is still
/// releasing the session it replaced.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<dyn SessionActor>>>,
    gates: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `actor` as the session for `user_id`.
    ///
    /// Any session already registered for the user is removed, released and
    /// destroyed before `actor` is installed. Concurrent registrations for
    /// the same user complete one at a time, in arrival order.
    pub async fn register(&self, user_id: &str, actor: Arc<dyn SessionActor>) {
        let gate = self.acquire_gate(user_id);
        let _turn = gate.lock().await;

        let prior = self.sessions.lock().remove(user_id);
        if let Some(prior) = prior {
            info!(
                user_id,
                evicted = prior.session_id(),
                replacement = actor.session_id(),
                "evicting previous session"
            );
            counter!(SESSION_EVICTIONS_TOTAL).increment(1);
            prior.release_resources().await;
        }

        {
            let mut sessions = self.sessions.lock();
            debug!(user_id, session_id = actor.session_id(), "session registered");
            let _ = sessions.insert(user_id.to_owned(), actor);
            record_size(sessions.len());
        }
    }

    /// The registration gate for `user_id`, shared with any register call
    /// already holding or waiting on it.
    fn acquire_gate(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock();

        if gates.len() > 128 {
            gates.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = gates.get(user_id).and_then(Weak::upgrade) {
            return existing;
        }

        let gate = Arc::new(tokio::sync::Mutex::new(()));
        let _ = gates.insert(user_id.to_owned(), Arc::downgrade(&gate));
        gate
    }

    /// Remove the session for `user_id`, if any.
    pub fn unregister(&self, user_id: &str) -> Option<Arc<dyn SessionActor>> {
        let mut sessions = self.sessions.lock();
        let removed = sessions.remove(user_id);
        record_size(sessions.len());
        removed
    }

    /// Remove the session for `user_id` only if it is `session_id`.
    ///
    /// Returns whether an entry was removed.
    pub fn unregister_session(&self, user_id: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock();
        let owned = sessions
            .get(user_id)
            .is_some_and(|actor| actor.session_id() == session_id);
        if owned {
            let _ = sessions.remove(user_id);
            record_size(sessions.len());
            debug!(user_id, session_id, "session unregistered");
        }
        owned
    }

    /// The session registered for `user_id`.
    pub fn get(&self, user_id: &str) -> Option<Arc<dyn SessionActor>> {
        self.sessions.lock().get(user_id).cloned()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_size(len: usize) {
    gauge!(SESSIONS_ACTIVE).set(len as f64);
}
