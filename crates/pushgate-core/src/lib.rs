//! # pushgate-core
//!
//! Shared vocabulary for the pushgate crates:
//!
//! - **Envelopes**: [`Request`] and [`Response`], the JSON frames exchanged with a peer
//! - **Commands**: [`Command`] parsed from a request's `cmd` field
//! - **Session parameters**: [`SessionParams`] resolved once per connection
//! - **Errors**: [`ProtocolError`] and [`QueueFullError`] via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod params;
pub mod protocol;

pub use errors::{ProtocolError, QueueFullError};
pub use params::SessionParams;
pub use protocol::{Command, Request, Response, ResponseType};
