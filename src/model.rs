//! The model root: the embedding host's single entry point, owning every
//! connection, buffer, DCC transfer, and piece of externally-persisted
//! configuration the engine consumes (spec.md §3 "Model (root aggregate)").

use std::collections::HashMap;

use crate::buffer::{Buffer, ChannelBuffer, Kind, NoticeBuffer, ServerBuffer, UserBuffer};
use crate::config::{AutoJoinEntry, AutoModeEntry, ConnectionScript, ContactEntry, IgnoreEntry};
use crate::connection::manager::ConnectionManager;
use crate::dcc::{DccChat, DccSend};
use crate::id::{BufferId, ConnectionId, DccId, IdSource, MessageId};
use crate::macros::MacroSet;

/// Any one of the four buffer kinds, stored together so the model can look
/// one up by id without knowing its kind ahead of time.
pub enum AnyBuffer {
    Server(ServerBuffer),
    Channel(ChannelBuffer),
    User(UserBuffer),
    Notice(NoticeBuffer),
}

impl AnyBuffer {
    pub fn base(&self) -> &Buffer {
        match self {
            AnyBuffer::Server(b) => &b.buffer,
            AnyBuffer::Channel(b) => &b.buffer,
            AnyBuffer::User(b) => &b.buffer,
            AnyBuffer::Notice(b) => &b.buffer,
        }
    }

    pub fn base_mut(&mut self) -> &mut Buffer {
        match self {
            AnyBuffer::Server(b) => &mut b.buffer,
            AnyBuffer::Channel(b) => &mut b.buffer,
            AnyBuffer::User(b) => &mut b.buffer,
            AnyBuffer::Notice(b) => &mut b.buffer,
        }
    }

    pub fn kind(&self) -> Kind {
        self.base().kind
    }
}

/// Read/write collaborators for persisted state the model never loads from
/// disk itself (spec.md §1, §4.7); the embedding host supplies whatever
/// backs these, typically reloaded from [`crate::config::Config`].
#[derive(Default)]
pub struct PersistedState {
    pub auto_joins: Vec<AutoJoinEntry>,
    pub contacts: Vec<ContactEntry>,
    pub ignores: Vec<IgnoreEntry>,
    pub auto_modes: Vec<AutoModeEntry>,
    pub connection_scripts: Vec<ConnectionScript>,
}

/// The root aggregate: the single object an embedding host constructs and
/// drives. Owns the connection manager, every buffer (indexed by id so
/// components can hold a [`BufferId`] rather than a reference, per spec.md
/// §9's "arena-style indices"), DCC transfers, the macro set, and persisted
/// state snapshots.
pub struct Model {
    ids: IdSource,
    pub connections: ConnectionManager,
    buffers: HashMap<BufferId, AnyBuffer>,
    pub dcc_sends: HashMap<DccId, DccSend>,
    pub dcc_chats: HashMap<DccId, DccChat>,
    pub macros: MacroSet,
    pub persisted: PersistedState,
    pub buffer_capacity: usize,
}

impl Default for Model {
    fn default() -> Self {
        Model::new(500)
    }
}

impl Model {
    pub fn new(buffer_capacity: usize) -> Model {
        Model {
            ids: IdSource::new(),
            connections: ConnectionManager::new(),
            buffers: HashMap::new(),
            dcc_sends: HashMap::new(),
            dcc_chats: HashMap::new(),
            macros: MacroSet::default(),
            persisted: PersistedState::default(),
            buffer_capacity,
        }
    }

    pub fn next_buffer_id(&self) -> BufferId {
        BufferId(self.ids.next())
    }

    pub fn next_dcc_id(&self) -> DccId {
        DccId(self.ids.next())
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.ids.next())
    }

    pub fn next_message_id(&self) -> MessageId {
        MessageId(self.ids.next())
    }

    pub fn insert_buffer(&mut self, buffer: AnyBuffer) -> BufferId {
        let id = buffer.base().id;
        self.buffers.insert(id, buffer);
        id
    }

    pub fn buffer(&self, id: BufferId) -> Option<&AnyBuffer> {
        self.buffers.get(&id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut AnyBuffer> {
        self.buffers.get_mut(&id)
    }

    /// Removes a buffer outright (e.g. once it has closed and every
    /// observer has detached).
    pub fn remove_buffer(&mut self, id: BufferId) -> Option<AnyBuffer> {
        self.buffers.remove(&id)
    }

    /// Finds a connection's channel buffer by name, comparing under that
    /// connection's current casemapping.
    pub fn find_channel(&self, connection_id: ConnectionId, name: &str) -> Option<&ChannelBuffer> {
        self.buffers.values().find_map(|b| match b {
            AnyBuffer::Channel(c) if c.buffer.connection_id == connection_id && c.casemapping.eq(&c.buffer.display_name, name) => {
                Some(c)
            }
            _ => None,
        })
    }

    /// Drains every buffer's due `/DELAY`/`/TIMER` commands, returning each
    /// as `(connection, buffer, line)` for the engine to resubmit as fresh
    /// input (spec.md §4.3).
    pub fn due_commands(&mut self) -> Vec<(ConnectionId, BufferId, String)> {
        let mut out = Vec::new();
        for (id, buffer) in self.buffers.iter_mut() {
            let connection_id = buffer.base().connection_id;
            for line in buffer.base_mut().due_commands() {
                out.push((connection_id, *id, line));
            }
        }
        out
    }

    /// Sweeps every buffer for orphans (no strong observers left) and
    /// removes them, returning the ids removed so the caller can notify a
    /// manager observer (spec.md §3: "destroyed when no strong observers
    /// remain").
    pub fn sweep_orphaned_buffers(&mut self) -> Vec<BufferId> {
        let orphaned: Vec<BufferId> = self
            .buffers
            .iter()
            .filter(|(_, b)| b.base().is_orphaned())
            .map(|(id, _)| *id)
            .collect();
        for id in &orphaned {
            self.buffers.remove(id);
        }
        orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ServerBuffer;

    #[test]
    fn inserts_and_looks_up_a_buffer_by_id() {
        let mut model = Model::new(100);
        let id = model.next_buffer_id();
        let sb = ServerBuffer::new(id, ConnectionId(1), "irc.example.net".into(), 100);
        model.insert_buffer(AnyBuffer::Server(sb));
        assert!(model.buffer(id).is_some());
        assert_eq!(model.buffer(id).unwrap().kind(), Kind::Server);
    }

    #[test]
    fn sweeps_orphaned_buffers() {
        let mut model = Model::new(100);
        let id = model.next_buffer_id();
        let mut sb = ServerBuffer::new(id, ConnectionId(1), "irc.example.net".into(), 100);
        let handle = sb.buffer.subscribe(crate::observer::Strength::Strong, Box::new(|_| {}));
        model.insert_buffer(AnyBuffer::Server(sb));
        assert!(model.sweep_orphaned_buffers().is_empty());
        if let Some(AnyBuffer::Server(sb)) = model.buffer_mut(id) {
            sb.buffer.unsubscribe(handle);
        }
        assert_eq!(model.sweep_orphaned_buffers(), vec![id]);
        assert!(model.buffer(id).is_none());
    }
}
