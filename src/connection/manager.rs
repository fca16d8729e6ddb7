//! Owns every live connection, fans out manager-level observer hooks, and
//! tracks which buffer each embedding-host window currently has active
//! (spec.md §2 "Connection manager", §4.3 "Filter hook").

use std::collections::HashMap;

use ircproto::Message;

use crate::connection::{Connection, ConnectionEvent};
use crate::id::{BufferId, ConnectionId, IdSource};

/// Manager-level hooks a host can install to intercept inbound traffic
/// before it is routed, and to react to connection lifecycle events
/// (spec.md §4.3: "query_disconnect / filter_message on the
/// connection-manager observer list can swallow a message before routing").
pub trait ManagerObserver {
    /// Called for every inbound message before routing. Returning `false`
    /// swallows the message.
    fn filter_message(&mut self, _connection: ConnectionId, _message: &Message) -> bool {
        true
    }

    /// Called when a collector or buffer wants to know whether the host
    /// would like to suppress a disconnect-driven UI action.
    fn query_disconnect(&mut self, _connection: ConnectionId) -> bool {
        true
    }

    fn connection_event(&mut self, _connection: ConnectionId, _event: &ConnectionEvent) {}

    /// Consulted when every identity alternate has been exhausted during
    /// registration (spec.md §4.2: "if exhausted, call GUI callback").
    /// Returning `Some(nick)` supplies one more nickname to try.
    fn nickname_exhausted(&mut self, _connection: ConnectionId) -> Option<String> {
        None
    }
}

/// Owns every connection the model has created, keyed by id, plus which
/// buffer each named "window" (an opaque host-defined key, e.g. a tab id)
/// currently shows.
pub struct ConnectionManager {
    ids: IdSource,
    connections: HashMap<ConnectionId, Connection>,
    active_buffers: HashMap<String, BufferId>,
    observers: Vec<Box<dyn ManagerObserver + Send>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        ConnectionManager::new()
    }
}

impl ConnectionManager {
    pub fn new() -> ConnectionManager {
        ConnectionManager {
            ids: IdSource::new(),
            connections: HashMap::new(),
            active_buffers: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.ids.next())
    }

    pub fn insert(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        id
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(&id)?;
        self.active_buffers.retain(|_, buffer_id| *buffer_id != removed.server_buffer);
        Some(removed)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.values_mut()
    }

    pub fn subscribe(&mut self, observer: Box<dyn ManagerObserver + Send>) {
        self.observers.push(observer);
    }

    /// Runs every manager observer's `filter_message` hook; the message is
    /// swallowed if any observer returns `false`.
    pub fn filter_message(&mut self, connection: ConnectionId, message: &Message) -> bool {
        self.observers.iter_mut().all(|o| o.filter_message(connection, message))
    }

    pub fn broadcast_event(&mut self, connection: ConnectionId, event: ConnectionEvent) {
        for observer in &mut self.observers {
            observer.connection_event(connection, &event);
        }
    }

    pub fn set_active_buffer(&mut self, window: String, buffer: BufferId) {
        self.active_buffers.insert(window, buffer);
    }

    pub fn active_buffer(&self, window: &str) -> Option<BufferId> {
        self.active_buffers.get(window).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Identity, Server};
    use crate::connection::ReconnectPlan;

    fn stub_connection(id: u64) -> Connection {
        let identity = Identity {
            nickname: "alice".into(),
            alternates: vec![],
            realname: "Alice".into(),
            username: "alice".into(),
            invisible: false,
        };
        let server = Server {
            network: "Net".into(),
            name: "irc.example.net".into(),
            address: "irc.example.net".into(),
            ports: vec![(6667, 6667)],
            password: None,
            tls: false,
        };
        Connection::new(
            ConnectionId(id),
            server.clone(),
            identity,
            None,
            BufferId(id),
            ReconnectPlan::new(vec![server]),
        )
    }

    struct Blocker;
    impl ManagerObserver for Blocker {
        fn filter_message(&mut self, _connection: ConnectionId, _message: &Message) -> bool {
            false
        }
    }

    #[test]
    fn insert_and_lookup_round_trip() {
        let mut manager = ConnectionManager::new();
        let id = manager.insert(stub_connection(1));
        assert!(manager.get(id).is_some());
        manager.remove(id);
        assert!(manager.get(id).is_none());
    }

    #[test]
    fn filter_message_is_swallowed_when_any_observer_objects() {
        let mut manager = ConnectionManager::new();
        manager.subscribe(Box::new(Blocker));
        let msg = Message::from_command(None, ircproto::Command::Ping("x".into(), None));
        assert!(!manager.filter_message(ConnectionId(1), &msg));
    }

    #[test]
    fn tracks_active_buffer_per_window() {
        let mut manager = ConnectionManager::new();
        manager.set_active_buffer("main-window".into(), BufferId(5));
        assert_eq!(manager.active_buffer("main-window"), Some(BufferId(5)));
        assert_eq!(manager.active_buffer("other"), None);
    }
}
