//! HTTP server: `/ws` upgrade, `/health` and `/metrics`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{OriginalUri, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::CookieJar;
use metrics_exporter_prometheus::PrometheusHandle;
use pushgate_auth::TokenValidator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::adapter::ConnectionInfo;
use crate::config::ServerConfig;
use crate::health::{HealthResponse, health_check};
use crate::session::{LifecycleOrchestrator, SessionRegistry};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{WsConnection, run_ws_session};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection lifecycle.
    pub orchestrator: Arc<LifecycleOrchestrator>,
    /// Live sessions.
    pub registry: Arc<SessionRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Open WebSocket connections.
    pub connections: Arc<AtomicUsize>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The push gateway server.
pub struct PushServer {
    state: AppState,
}

impl PushServer {
    /// Create a server. Nothing is bound until [`listen`](Self::listen).
    pub fn new(
        config: ServerConfig,
        validator: Arc<dyn TokenValidator>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let orchestrator = Arc::new(LifecycleOrchestrator::new(
            registry.clone(),
            validator,
            config.actor,
        ));
        Self {
            state: AppState {
                orchestrator,
                registry,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                config: Arc::new(config),
                connections: Arc::new(AtomicUsize::new(0)),
                start_time: Instant::now(),
                metrics,
            },
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address and the serve task, which ends after
    /// [`ShutdownCoordinator::shutdown`].
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let config = &self.state.config;
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, "pushgate listening");
        Ok((addr, handle))
    }

    /// Live session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Open WebSocket connections.
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::Relaxed)
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    jar: CookieJar,
    OriginalUri(uri): OriginalUri,
) -> impl IntoResponse {
    let info = ConnectionInfo {
        cookie: jar
            .get(&state.config.cookie_name)
            .map(|c| c.value().to_owned())
            .unwrap_or_default(),
        url: uri.to_string(),
    };
    let id = format!("conn_{}", Uuid::now_v7());

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let (connection, outbound_rx) =
                WsConnection::new(id, info, state.shutdown.child_token());
            let _ = state.connections.fetch_add(1, Ordering::Relaxed);
            run_ws_session(
                socket,
                Arc::new(connection),
                outbound_rx,
                state.orchestrator.clone(),
            )
            .await;
            let _ = state.connections.fetch_sub(1, Ordering::Relaxed);
        })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_check(
        state.start_time,
        state.connections.load(Ordering::Relaxed),
        state.registry.len(),
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(crate::metrics::render)
        .unwrap_or_default()
}
