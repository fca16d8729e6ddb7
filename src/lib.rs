//! An embeddable IRC client engine.
//!
//! Layering, bottom to top: [`connection`] owns the wire transport and the
//! RFC 1459/2812 registration state machine for one server; [`buffer`] is
//! the multi-buffer scrollback/observer fabric messages get routed into;
//! [`model`] is the root aggregate tying connections, buffers, DCC
//! transfers, and macros together behind id indirection; [`collectors`] and
//! [`watchers`] are the small stateful/stateless helpers that turn raw
//! multi-line server replies and persisted entries into engine-level
//! events. [`config`] is how the embedding host feeds in identities,
//! servers, and persisted lists without the engine ever touching a
//! filesystem itself.

pub mod buffer;
pub mod collectors;
pub mod commands;
pub mod config;
pub mod connection;
pub mod dcc;
pub mod engine;
pub mod error;
pub mod id;
pub mod macros;
pub mod model;
pub mod observer;
pub mod watchers;

pub use engine::Engine;
pub use error::{Error, Result};
pub use id::{BufferId, ConnectionId, DccId, IdSource, MessageId};
pub use model::Model;
