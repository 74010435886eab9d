//! Session actors, the per-user registry and connection lifecycle.

pub mod actor;
pub mod lifecycle;
pub mod registry;

pub use actor::{ActorState, PushActor, SessionActor};
pub use lifecycle::LifecycleOrchestrator;
pub use registry::SessionRegistry;
