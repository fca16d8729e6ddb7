//! The server buffer: one per connection, carrying everything not routed to
//! a more specific buffer (spec.md §3 "Server buffer").

use crate::buffer::{Buffer, Kind};
use crate::id::{BufferId, ConnectionId};

/// The server buffer for a connection. Always exists for the lifetime of its
/// connection and is never orphan-closed by the routing fabric, unlike
/// channel/user/notice buffers.
pub struct ServerBuffer {
    pub buffer: Buffer,
    pub network_name: Option<String>,
    pub motd: Vec<String>,
}

impl ServerBuffer {
    pub fn new(id: BufferId, connection_id: ConnectionId, display_name: String, capacity: usize) -> ServerBuffer {
        ServerBuffer {
            buffer: Buffer::new(id, connection_id, Kind::Server, display_name, capacity),
            network_name: None,
            motd: Vec::new(),
        }
    }

    /// Appends one line of a `375`/`372`/`376` MOTD sequence.
    pub fn push_motd_line(&mut self, line: String) {
        self.motd.push(line);
    }

    pub fn clear_motd(&mut self) {
        self.motd.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_motd_lines() {
        let mut sb = ServerBuffer::new(BufferId(1), ConnectionId(1), "irc.example.net".into(), 10);
        sb.push_motd_line("- Welcome".into());
        sb.push_motd_line("- to the server".into());
        assert_eq!(sb.motd.len(), 2);
    }
}
