//! # pushgate-auth
//!
//! Turns connection metadata into [`SessionParams`](pushgate_core::SessionParams).
//!
//! - [`resolve_session_params`]: cookie-first, then `token` URL query parameter
//! - [`TokenValidator`]: the boundary to whatever derives a user identity from
//!   a token, with [`StaticTokens`] and [`TokenAsUserId`] for deployments
//!   without an external validator
//! - [`AuthError`]: why a connection was rejected

#![deny(unsafe_code)]

pub mod errors;
pub mod resolver;
pub mod validator;

pub use errors::AuthError;
pub use resolver::resolve_session_params;
pub use validator::{Identity, StaticTokens, TokenAsUserId, TokenValidator, validator_from_settings};
