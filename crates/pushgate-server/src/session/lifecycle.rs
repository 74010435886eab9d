//! Connection lifecycle: connect, message, disconnect.

use std::sync::Arc;

use metrics::counter;
use pushgate_auth::{AuthError, TokenValidator, resolve_session_params};
use pushgate_core::Response;
use tracing::{debug, error, info, warn};

use super::actor::{PushActor, SessionActor};
use super::registry::SessionRegistry;
use crate::adapter::{ConnectionAdapter, Frame, SessionBinding, send_response};
use crate::config::ActorConfig;
use crate::metrics::{SESSION_AUTH_FAILURES_TOTAL, SESSION_QUEUE_FULL_TOTAL};

/// Wires connection events to session actors and the registry.
pub struct LifecycleOrchestrator {
    registry: Arc<SessionRegistry>,
    validator: Arc<dyn TokenValidator>,
    actor_config: ActorConfig,
}

impl LifecycleOrchestrator {
    /// Create an orchestrator over a shared registry.
    pub fn new(
        registry: Arc<SessionRegistry>,
        validator: Arc<dyn TokenValidator>,
        actor_config: ActorConfig,
    ) -> Self {
        Self {
            registry,
            validator,
            actor_config,
        }
    }

    /// The registry sessions are installed into.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Authenticate a new connection and start its session.
    ///
    /// On failure the peer gets a failure response, the connection is closed
    /// and the error is returned; no session is created.
    pub async fn on_connect(&self, adapter: Arc<dyn ConnectionAdapter>) -> Result<(), AuthError> {
        let info = adapter.info();
        let params = match resolve_session_params(
            &info.cookie,
            &info.url,
            adapter.id(),
            self.validator.as_ref(),
        ) {
            Ok(params) => params,
            Err(e) => {
                warn!(conn_id = adapter.id(), error = %e, "rejecting connection");
                counter!(SESSION_AUTH_FAILURES_TOTAL).increment(1);
                let _ = send_response(
                    adapter.as_ref(),
                    &Response::failure(format!("check token failed: {e}")),
                );
                adapter.close();
                return Err(e);
            }
        };

        let user_id = params.user_id.clone();
        let actor: Arc<dyn SessionActor> =
            PushActor::spawn(adapter.clone(), params, self.actor_config);
        self.registry.register(&user_id, actor.clone()).await;

        info!(conn_id = adapter.id(), user_id = %user_id, "session established");
        adapter.attach(SessionBinding { actor, user_id });
        Ok(())
    }

    /// Forward an inbound frame to the connection's session.
    ///
    /// A full inbound queue force-destroys the connection.
    pub fn on_message(&self, adapter: &dyn ConnectionAdapter, frame: Frame) {
        let Some(binding) = adapter.binding() else {
            debug!(conn_id = adapter.id(), "no session attached, ignoring frame");
            return;
        };
        if let Err(e) = binding.actor.process_message(frame) {
            error!(
                conn_id = adapter.id(),
                user_id = %binding.user_id,
                error = %e,
                "dropping connection"
            );
            counter!(SESSION_QUEUE_FULL_TOTAL).increment(1);
            adapter.destroy();
        }
    }

    /// Tear down the connection's session, if one is attached.
    pub async fn on_disconnect(&self, adapter: &dyn ConnectionAdapter) {
        let Some(binding) = adapter.detach() else {
            debug!(conn_id = adapter.id(), "connection closed without a session");
            return;
        };
        binding.actor.destroy().await;
        let _ = self
            .registry
            .unregister_session(&binding.user_id, binding.actor.session_id());
        info!(conn_id = adapter.id(), user_id = %binding.user_id, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ConnectionInfo;
    use crate::testing::RecordingAdapter;
    use assert_matches::assert_matches;
    use pushgate_auth::{Identity, StaticTokens, TokenAsUserId};
    use pushgate_core::ResponseType;
    use serde_json::json;
    use std::time::Duration;

    fn orchestrator() -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(TokenAsUserId),
            ActorConfig::default(),
        )
    }

    fn subscribe(topic: &str) -> Frame {
        Frame::Text(json!({"cmd": "subscribe", "topic": topic}).to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn connect_without_token_is_rejected() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::new("c1");

        let result = orch.on_connect(adapter.clone()).await;
        assert_matches!(result, Err(AuthError::MissingToken));

        let sent = adapter.responses();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].response_type, ResponseType::OperationResult);
        assert!(!sent[0].success);
        assert!(!sent[0].err_msg.is_empty());
        assert_eq!(adapter.close_count(), 1);
        assert!(adapter.binding().is_none());
        assert!(orch.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_token_is_rejected() {
        let orch = LifecycleOrchestrator::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(StaticTokens::new()),
            ActorConfig::default(),
        );
        let adapter = RecordingAdapter::with_url_token("c1", "abc123");

        assert_matches!(
            orch.on_connect(adapter.clone()).await,
            Err(AuthError::EmptyIdentity)
        );
        assert_eq!(adapter.close_count(), 1);
        assert!(orch.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_registers_and_attaches_session() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::with_url_token("c1", "abc123");

        orch.on_connect(adapter.clone()).await.unwrap();

        let binding = adapter.binding().unwrap();
        assert_eq!(binding.user_id, "abc123");
        assert_eq!(binding.actor.session_id(), "c1");
        assert_eq!(orch.registry().get("abc123").unwrap().session_id(), "c1");
        assert_eq!(adapter.count_of(ResponseType::HeartbeatConfig), 1);
        assert_eq!(adapter.close_count(), 0);

        orch.on_disconnect(adapter.as_ref()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn cookie_identity_from_static_table() {
        let tokens = StaticTokens::new().with(
            "secret",
            Identity {
                user_id: "u-7".into(),
                ..Identity::default()
            },
        );
        let orch = LifecycleOrchestrator::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(tokens),
            ActorConfig::default(),
        );
        let adapter = RecordingAdapter::with_info(
            "c1",
            ConnectionInfo {
                cookie: "secret".into(),
                url: "/ws".into(),
            },
        );

        orch.on_connect(adapter.clone()).await.unwrap();
        assert!(orch.registry().get("u-7").is_some());
        orch.on_disconnect(adapter.as_ref()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_evicts_previous_connection() {
        let orch = orchestrator();
        let first = RecordingAdapter::with_url_token("c1", "abc");
        let second = RecordingAdapter::with_url_token("c2", "abc");

        orch.on_connect(first.clone()).await.unwrap();
        orch.on_connect(second.clone()).await.unwrap();

        assert_eq!(first.close_count(), 1);
        assert_eq!(second.close_count(), 0);
        assert_eq!(orch.registry().len(), 1);
        assert_eq!(orch.registry().get("abc").unwrap().session_id(), "c2");

        // The superseded transport reports its disconnect late.
        orch.on_disconnect(first.as_ref()).await;
        assert_eq!(orch.registry().get("abc").unwrap().session_id(), "c2");

        orch.on_disconnect(second.as_ref()).await;
        assert!(orch.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_connects_leave_one_live_session() {
        let orch = orchestrator();
        let adapters: Vec<_> = (1..=3)
            .map(|i| RecordingAdapter::with_url_token(&format!("c{i}"), "abc"))
            .collect();

        let (r1, r2, r3) = tokio::join!(
            orch.on_connect(adapters[0].clone()),
            orch.on_connect(adapters[1].clone()),
            orch.on_connect(adapters[2].clone()),
        );
        r1.unwrap();
        r2.unwrap();
        r3.unwrap();

        assert_eq!(orch.registry().len(), 1);
        let winner = orch.registry().get("abc").unwrap().session_id().to_owned();
        for adapter in &adapters {
            let expected = usize::from(adapter.id() != winner);
            assert_eq!(adapter.close_count(), expected, "{}", adapter.id());
        }

        for adapter in &adapters {
            orch.on_disconnect(adapter.as_ref()).await;
        }
        assert!(orch.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn messages_reach_the_session() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::with_url_token("c1", "abc");
        orch.on_connect(adapter.clone()).await.unwrap();

        orch.on_message(adapter.as_ref(), subscribe("news"));
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(adapter.count_of(ResponseType::OperationResult), 1);
        orch.on_disconnect(adapter.as_ref()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn frames_before_connect_are_ignored() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::new("c1");

        orch.on_message(adapter.as_ref(), subscribe("news"));
        assert!(adapter.sent().is_empty());
        assert_eq!(adapter.destroy_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_overflow_destroys_connection() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::with_url_token("c1", "abc");
        orch.on_connect(adapter.clone()).await.unwrap();

        for _ in 0..11 {
            orch.on_message(adapter.as_ref(), subscribe("news"));
        }
        assert_eq!(adapter.destroy_count(), 1);

        orch.on_disconnect(adapter.as_ref()).await;
        assert!(orch.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_timeout_flows_through_disconnect() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::with_url_token("c1", "abc");
        orch.on_connect(adapter.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(adapter.destroy_count(), 1);
        assert_eq!(orch.registry().len(), 1);

        // The transport reports the forced close.
        orch.on_disconnect(adapter.as_ref()).await;
        assert!(orch.registry().is_empty());
        assert!(adapter.binding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_without_session_is_noop() {
        let orch = orchestrator();
        let adapter = RecordingAdapter::new("c1");
        orch.on_disconnect(adapter.as_ref()).await;
        assert!(orch.registry().is_empty());
    }
}
