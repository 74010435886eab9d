//! # pushgate-server
//!
//! Push-session gateway over WebSocket.
//!
//! - [`session::actor`]: one [`PushActor`](session::actor::PushActor) per
//!   connection: heartbeat push, liveness check, bounded inbound queue,
//!   request dispatch
//! - [`session::registry`]: at most one live session per user
//! - [`session::lifecycle`]: connect / message / disconnect orchestration
//! - [`websocket`]: the axum-backed [`ConnectionAdapter`](adapter::ConnectionAdapter)
//! - HTTP endpoints: `/ws`, `/health`, `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod testing;
pub mod websocket;
