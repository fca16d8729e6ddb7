//! The DCC (Direct Client-to-Client) subsystem: CHAT and SEND, layered over
//! CTCP payloads carried in ordinary `PRIVMSG`s (spec.md §4.5/§6).

pub mod chat;
pub mod ctcp;
pub mod send;

use std::time::Duration;

use ircproto::User;
use thiserror::Error;

use crate::id::DccId;

pub use chat::DccChat;
pub use send::{DccSend, ResumeData, SendType};

/// How long a DCC connection may sit idle before the engine force-closes it.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Errors specific to the DCC subsystem.
#[derive(Debug, Error)]
pub enum DccError {
    /// The peer connection could not be opened or was refused.
    #[error("dcc connection failed: {0}")]
    ConnectFailed(std::io::Error),
    /// A local file could not be opened for reading or writing.
    #[error("dcc file i/o error: {0}")]
    FileIo(std::io::Error),
    /// The peer's offer could not be parsed (bad address/port/size fields).
    #[error("malformed dcc offer: {0}")]
    MalformedOffer(String),
    /// The transfer was idle past [`INACTIVITY_TIMEOUT`].
    #[error("dcc connection timed out")]
    InactivityTimeout,
}

/// The two kinds of DCC connection this engine supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DccKind {
    Chat,
    Send,
}

/// Fields shared by every DCC connection (spec.md §3 "DCC connection
/// (abstract)"), embedded by [`DccChat`] and [`DccSend`].
#[derive(Debug)]
pub struct DccBase {
    pub id: DccId,
    pub kind: DccKind,
    pub name: String,
    pub local_user: User,
    pub remote_user: User,
    pub ready: bool,
    pub closing: bool,
}

impl DccBase {
    pub fn new(id: DccId, kind: DccKind, name: String, local_user: User, remote_user: User) -> DccBase {
        DccBase {
            id,
            kind,
            name,
            local_user,
            remote_user,
            ready: false,
            closing: false,
        }
    }
}

/// A 32-bit IPv4 address as carried in a DCC offer (network order decoded to
/// a plain integer, then formatted back to dotted-quad for display).
pub fn decode_dcc_address(raw: u32) -> std::net::Ipv4Addr {
    std::net::Ipv4Addr::from(raw)
}

/// Encodes an IPv4 address into the 32-bit unsigned integer DCC puts on the
/// wire (spec.md §6: "addresses are 32-bit unsigned integers in network-host
/// order decimal").
pub fn encode_dcc_address(addr: std::net::Ipv4Addr) -> u32 {
    u32::from(addr)
}

/// Hooks the embedding host implements to react to DCC lifecycle events and
/// to arbitrate retry on access-denied (spec.md §6 CLI/UI boundary's
/// "download-file dialog"; the retry hook is carried from
/// `original_source/client/dcc_send_connection.hpp`'s
/// `dcc_transfer_access_denied(bool&)`).
pub trait DccObserver {
    fn transfer_started(&mut self, _dcc: &DccSend) {}
    fn transfer_progress(&mut self, _dcc: &DccSend) {}
    /// Called when opening the local file failed (e.g. permission denied).
    /// Returning `true` asks the engine to retry the open.
    fn access_denied(&mut self, _dcc: &DccSend) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips() {
        let addr: std::net::Ipv4Addr = "192.168.1.10".parse().unwrap();
        assert_eq!(decode_dcc_address(encode_dcc_address(addr)), addr);
    }
}
