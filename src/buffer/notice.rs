//! The notice buffer: a connection-wide catch-all for server notices that
//! don't belong to any channel or query (spec.md §3 "Notice buffer").

use crate::buffer::{Buffer, Kind};
use crate::id::{BufferId, ConnectionId};

pub struct NoticeBuffer {
    pub buffer: Buffer,
}

impl NoticeBuffer {
    pub fn new(id: BufferId, connection_id: ConnectionId, capacity: usize) -> NoticeBuffer {
        NoticeBuffer {
            buffer: Buffer::new(id, connection_id, Kind::Notice, "*notices*".into(), capacity),
        }
    }
}
