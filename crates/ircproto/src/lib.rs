//! Pure IRC wire protocol support: the message codec, case-folding, the
//! `nick!user@host` user model, channel/user modes, CTCP framing, numeric
//! replies, and nice-form text rendering.
//!
//! This crate performs no I/O; it has no knowledge of sockets, tasks, or
//! time. The connection state machine and buffer model that consume it live
//! in `ircengine`.

#![warn(missing_docs)]
#![allow(clippy::needless_doctest_main)]

pub mod casemap;
pub mod chan;
#[cfg(feature = "codec")]
pub mod codec;
pub mod command;
pub mod ctcp;
pub mod error;
#[cfg(feature = "codec")]
pub mod line;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod render;
pub mod response;
pub mod user;

pub use casemap::CaseMapping;
pub use chan::ChannelExt;
#[cfg(feature = "codec")]
pub use codec::MessageCodec;
pub use command::Command;
pub use error::{Error, ParseError, Result};
#[cfg(feature = "codec")]
pub use line::LineCodec;
pub use message::{Message, MessageKind};
pub use mode::{ChannelMode, Mode, PrefixTable, UserMode};
pub use prefix::Prefix;
pub use response::Response;
pub use user::{mask_matches, User};
