//! The user (query) buffer: a private one-on-one conversation (spec.md §3
//! "User buffer").

use ircproto::User;

use crate::buffer::{Buffer, Kind};
use crate::id::{BufferId, ConnectionId};

pub struct UserBuffer {
    pub buffer: Buffer,
    pub peer: User,
}

impl UserBuffer {
    pub fn new(id: BufferId, connection_id: ConnectionId, peer: User, capacity: usize) -> UserBuffer {
        let display_name = peer.nickname().to_owned();
        UserBuffer {
            buffer: Buffer::new(id, connection_id, Kind::User, display_name, capacity),
            peer,
        }
    }

    /// Renames the buffer to follow the peer through a `NICK` change,
    /// without losing scrollback or observers (spec.md §4.3: "a user buffer
    /// tracks its peer's nickname changes in place").
    pub fn rename(&mut self, new_peer: User) {
        self.buffer.display_name = new_peer.nickname().to_owned();
        self.peer = new_peer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircproto::CaseMapping;

    #[test]
    fn rename_follows_nick_change_in_place() {
        let mut ub = UserBuffer::new(
            BufferId(1),
            ConnectionId(1),
            User::new("bob", "b", "h", CaseMapping::default()),
            10,
        );
        assert_eq!(ub.buffer.display_name, "bob");
        ub.rename(User::new("bobby", "b", "h", CaseMapping::default()));
        assert_eq!(ub.buffer.display_name, "bobby");
        assert_eq!(ub.peer.nickname(), "bobby");
    }
}
