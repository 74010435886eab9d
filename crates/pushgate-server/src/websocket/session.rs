//! A single WebSocket connection from upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::connection::{Outbound, WsConnection};
use crate::adapter::{ConnectionAdapter, Frame};
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::session::LifecycleOrchestrator;

/// Drive one connection.
///
/// 1. Spawns the writer task draining the outbound channel
/// 2. Runs `on_connect` (authentication and session start)
/// 3. Feeds inbound frames to `on_message` until the peer leaves or the
///    connection token is cancelled
/// 4. Runs `on_disconnect` and stops the writer
#[instrument(skip_all, fields(conn_id = %connection.id()))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection: Arc<WsConnection>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    orchestrator: Arc<LifecycleOrchestrator>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let cancel = connection.cancel_token().clone();

    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let writer_cancel = cancel.clone();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                () = writer_cancel.cancelled() => break,
                item = outbound_rx.recv() => match item {
                    Some(Outbound::Frame(Frame::Text(text))) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Frame(Frame::Binary(data))) => {
                        if ws_tx.send(Message::Binary(data.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close) => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    None => break,
                },
            }
        }
        // A closed writer ends the connection.
        writer_cancel.cancel();
    });

    let adapter: Arc<dyn ConnectionAdapter> = connection.clone();
    if orchestrator.on_connect(adapter.clone()).await.is_ok() {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                msg = ws_rx.next() => {
                    let Some(Ok(msg)) = msg else { break };
                    let frame = match msg {
                        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
                        Message::Binary(data) => Frame::Binary(data.to_vec()),
                        Message::Close(_) => {
                            info!("client sent close frame");
                            break;
                        }
                        Message::Ping(_) | Message::Pong(_) => continue,
                    };
                    orchestrator.on_message(adapter.as_ref(), frame);
                }
            }
        }
    } else {
        // The failure response and close frame are already queued.
        cancel.cancelled().await;
    }

    orchestrator.on_disconnect(adapter.as_ref()).await;
    cancel.cancel();
    if let Err(e) = writer.await {
        debug!(error = %e, "writer task ended abnormally");
    }

    info!(
        dropped_frames = connection.drop_count(),
        age_secs = connection.age().as_secs(),
        "client disconnected"
    );
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}
