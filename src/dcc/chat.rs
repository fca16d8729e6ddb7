//! DCC CHAT: a symmetric line stream between two peers, outside the server.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use ircproto::User;
use tokio::net::{TcpListener, TcpStream};

use crate::dcc::{DccBase, DccError, DccKind};
use crate::id::DccId;

/// A DCC CHAT connection: once established, behaves like a normal buffer
/// backed by a direct TCP stream instead of the IRC server (spec.md §4.5:
/// "CHAT buffer stores a bounded message deque like a normal buffer").
pub struct DccChat {
    pub base: DccBase,
    pub messages: VecDeque<String>,
    pub capacity: usize,
    stream: Option<TcpStream>,
    listener: Option<TcpListener>,
}

impl DccChat {
    pub fn new(id: DccId, name: String, local_user: User, remote_user: User, capacity: usize) -> DccChat {
        DccChat {
            base: DccBase::new(id, DccKind::Chat, name, local_user, remote_user),
            messages: VecDeque::new(),
            capacity,
            stream: None,
            listener: None,
        }
    }

    /// Opens a listener to advertise in a `DCC CHAT chat <addr> <port>`
    /// offer (the local/"Listen" role).
    pub async fn listen(&mut self, bind_addr: Ipv4Addr, base_port: u16, span: u16) -> Result<u16, DccError> {
        for port in base_port..=base_port.saturating_add(span) {
            let addr = std::net::SocketAddr::from((bind_addr, port));
            if let Ok(listener) = TcpListener::bind(addr).await {
                self.listener = Some(listener);
                return Ok(port);
            }
        }
        Err(DccError::ConnectFailed(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "no free DCC port in configured range",
        )))
    }

    /// Accepts the peer's connection to our listener.
    pub async fn accept(&mut self) -> Result<(), DccError> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            DccError::ConnectFailed(std::io::Error::new(std::io::ErrorKind::NotConnected, "no listener"))
        })?;
        let (stream, _) = listener.accept().await.map_err(DccError::ConnectFailed)?;
        self.stream = Some(stream);
        self.base.ready = true;
        Ok(())
    }

    /// Connects out to a peer's `DCC CHAT` offer (the remote/"accept" role).
    pub async fn connect(&mut self, addr: Ipv4Addr, port: u16) -> Result<(), DccError> {
        let stream = TcpStream::connect((addr, port)).await.map_err(DccError::ConnectFailed)?;
        self.stream = Some(stream);
        self.base.ready = true;
        Ok(())
    }

    /// Appends a line to the bounded scrollback, dropping the oldest entry
    /// if at capacity (mirrors the ordinary buffer ring; see
    /// `crate::buffer::MessageRing`).
    pub fn push_line(&mut self, line: String) -> Option<String> {
        let mut dropped = None;
        if self.messages.len() >= self.capacity {
            dropped = self.messages.pop_front();
        }
        self.messages.push_back(line);
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_stub(capacity: usize) -> DccChat {
        DccChat::new(
            DccId(1),
            "peer".into(),
            User::new("me", "m", "h", Default::default()),
            User::new("peer", "p", "h", Default::default()),
            capacity,
        )
    }

    #[test]
    fn ring_drops_oldest_past_capacity() {
        let mut chat = chat_stub(2);
        assert_eq!(chat.push_line("a".into()), None);
        assert_eq!(chat.push_line("b".into()), None);
        assert_eq!(chat.push_line("c".into()), Some("a".into()));
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages.front(), Some(&"b".to_string()));
    }
}
