//! The buffer model: a bounded, observed message stream bound to a
//! conceptual endpoint (server, channel, user, notice); spec.md §3/§4.3.

pub mod channel;
pub mod notice;
pub mod server;
pub mod user;

use std::collections::VecDeque;

use ircproto::Message;

pub use channel::ChannelBuffer;
pub use notice::NoticeBuffer;
pub use server::ServerBuffer;
pub use user::UserBuffer;

use crate::id::{BufferId, ConnectionId};
use crate::observer::{ObserverHandle, ObserverList, Strength};

/// A logged message plus the engine-level decorations spec.md §3's `Message`
/// entity carries beyond the wire line itself (id, timestamp, direction,
/// log-replay and buffer-required flags). The wire line lives in `ircproto`;
/// this wraps it for storage in a buffer's ring.
#[derive(Clone, Debug)]
pub struct Entry {
    pub id: u64,
    pub timestamp: chrono::DateTime<chrono::Local>,
    pub direction: Direction,
    pub message: Message,
    pub from_log: bool,
    pub buffer_required: bool,
}

/// Whether a message was received from the server or sent by us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// The four buffer kinds spec.md §2/§3 names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Server,
    Channel,
    User,
    Notice,
}

/// A bounded ring of [`Entry`] values. When full, the oldest entry is
/// dropped and returned so the caller can emit a removal notification
/// (spec.md §3 invariant: "oldest are dropped and a removal notification is
/// emitted").
#[derive(Debug, Default)]
pub struct MessageRing {
    entries: VecDeque<Entry>,
    capacity: usize,
}

impl MessageRing {
    pub fn new(capacity: usize) -> MessageRing {
        MessageRing {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an entry, returning the dropped entry (if the ring was at
    /// capacity).
    pub fn push(&mut self, entry: Entry) -> Option<Entry> {
        let dropped = if self.entries.len() >= self.capacity && self.capacity > 0 {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the ring, e.g. on an explicit `/CLEAR` command.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Events a buffer fans out to its observers. A UI, logger, or watcher
/// subscribes to these through [`Buffer::observers`].
#[derive(Clone, Debug)]
pub enum BufferEvent {
    MessageAdded(Entry),
    MessageRemoved(u64),
    Cleared,
    Closing,
}

/// Fields and behavior common to every buffer kind (spec.md §3 "Buffer
/// (abstract)").
pub struct Buffer {
    pub id: BufferId,
    pub connection_id: ConnectionId,
    pub kind: Kind,
    pub display_name: String,
    pub title: String,
    pub ring: MessageRing,
    pub ready: bool,
    pub closing: bool,
    /// Set by `/HIDE`/`/SHOW`; a display-only flag an embedding host's
    /// window list consults, not consulted by the engine itself.
    pub hidden: bool,
    pub observers: ObserverList<Box<dyn FnMut(&BufferEvent) + Send>>,
    ever_had_strong_observer: bool,
    pending_commands: Vec<PendingCommand>,
}

/// A delayed command queued via the `/DELAY ms command` or `/TIMER` input
/// commands (spec.md §4.3), to be re-submitted to the buffer after its delay
/// elapses.
#[derive(Clone, Debug)]
pub struct PendingCommand {
    pub line: String,
    pub due: std::time::Instant,
}

impl Buffer {
    pub fn new(id: BufferId, connection_id: ConnectionId, kind: Kind, display_name: String, capacity: usize) -> Buffer {
        Buffer {
            id,
            connection_id,
            kind,
            title: String::new(),
            display_name,
            ring: MessageRing::new(capacity),
            ready: true,
            closing: false,
            hidden: false,
            observers: ObserverList::new(),
            ever_had_strong_observer: false,
            pending_commands: Vec::new(),
        }
    }

    /// Registers an observer for this buffer's events.
    pub fn subscribe(
        &mut self,
        strength: Strength,
        observer: Box<dyn FnMut(&BufferEvent) + Send>,
    ) -> ObserverHandle {
        if strength == Strength::Strong {
            self.ever_had_strong_observer = true;
        }
        self.observers.subscribe(strength, observer)
    }

    pub fn unsubscribe(&mut self, handle: ObserverHandle) {
        self.observers.unsubscribe(handle);
    }

    /// Whether this buffer should self-close: it is not already closing, and
    /// it has had at least one strong observer that has since all detached.
    pub fn is_orphaned(&self) -> bool {
        !self.closing && self.observers.is_orphaned(self.ever_had_strong_observer)
    }

    /// Appends a message entry, fanning out `MessageAdded` (and
    /// `MessageRemoved` if the ring dropped an old entry to make room).
    /// No-ops past the point `closing` is set, except the terminal
    /// `Closing` event itself (spec.md §3 invariant: "While a buffer is in
    /// 'closing', no further notifications may be emitted except the final
    /// closing notice").
    pub fn push(&mut self, entry: Entry) {
        if self.closing {
            return;
        }
        if let Some(dropped) = self.ring.push(entry.clone()) {
            self.observers.notify(|o| o(&BufferEvent::MessageRemoved(dropped.id)));
        }
        self.observers.notify(|o| o(&BufferEvent::MessageAdded(entry.clone())));
    }

    /// Clears the ring and notifies observers, unless already closing.
    pub fn clear(&mut self) {
        if self.closing {
            return;
        }
        self.ring.clear();
        self.observers.notify(|o| o(&BufferEvent::Cleared));
    }

    /// Marks the buffer closing and emits the terminal notice. Further calls
    /// to `push`/`clear` are no-ops.
    pub fn close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.observers.notify(|o| o(&BufferEvent::Closing));
    }

    /// Queues a command to be resubmitted after `delay` elapses (`/DELAY`,
    /// `/TIMER`).
    pub fn delay_command(&mut self, line: String, delay: std::time::Duration) {
        self.pending_commands.push(PendingCommand {
            line,
            due: std::time::Instant::now() + delay,
        });
    }

    /// Drains and returns every pending command whose delay has elapsed.
    pub fn due_commands(&mut self) -> Vec<String> {
        let now = std::time::Instant::now();
        let (due, not_due): (Vec<_>, Vec<_>) = self.pending_commands.drain(..).partition(|c| c.due <= now);
        self.pending_commands = not_due;
        due.into_iter().map(|c| c.line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_entry(id: u64) -> Entry {
        Entry {
            id,
            timestamp: chrono::Local::now(),
            direction: Direction::Incoming,
            message: Message::parse("PING :x\r\n").unwrap(),
            from_log: false,
            buffer_required: true,
        }
    }

    #[test]
    fn ring_drops_oldest_past_capacity() {
        let mut ring = MessageRing::new(2);
        assert!(ring.push(ring_entry(1)).is_none());
        assert!(ring.push(ring_entry(2)).is_none());
        let dropped = ring.push(ring_entry(3)).unwrap();
        assert_eq!(dropped.id, 1);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn buffer_silences_everything_but_closing_notice_once_closing() {
        let mut buf = Buffer::new(BufferId(1), ConnectionId(1), Kind::Server, "server".into(), 10);
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let events_clone = events.clone();
        buf.subscribe(
            Strength::Strong,
            Box::new(move |e| events_clone.lock().unwrap().push(format!("{e:?}"))),
        );
        buf.close();
        buf.push(ring_entry(1));
        buf.clear();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn orphans_only_after_a_strong_observer_detaches() {
        let mut buf = Buffer::new(BufferId(1), ConnectionId(1), Kind::Channel, "#c".into(), 10);
        assert!(!buf.is_orphaned());
        let h = buf.subscribe(Strength::Strong, Box::new(|_| {}));
        assert!(!buf.is_orphaned());
        buf.unsubscribe(h);
        assert!(buf.is_orphaned());
    }
}
