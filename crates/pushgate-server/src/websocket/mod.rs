//! WebSocket transport: the socket-backed adapter and the per-connection loop.

pub mod connection;
pub mod session;

pub use connection::{Outbound, WsConnection};
pub use session::run_ws_session;
