//! Monotonic id generation, shared by messages, buffers, and connections.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter unique across the model's lifetime.
/// Every `Message`, `Buffer`, and `Connection` the model creates draws its id
/// from one of these, never reusing a value even after the entity is
/// destroyed (spec.md §3: "Ids are monotonic and unique across model
/// lifetime").
#[derive(Debug, Default)]
pub struct IdSource(AtomicU64);

impl IdSource {
    /// Creates a fresh source starting at 0; the first `next()` returns 1.
    pub fn new() -> IdSource {
        IdSource(AtomicU64::new(0))
    }

    /// Allocates the next id.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// A buffer's id, distinct from a message id or connection id by type even
/// though all are `u64` under the hood.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(pub u64);

/// A connection's id, used by the manager to indirect to the live
/// `Connection` without components holding a direct reference to it (spec.md
/// §9: "components hold a ConnectionId, not a reference").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

/// A message's id, monotonic per model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

/// A DCC connection's id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DccId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_start_at_one() {
        let src = IdSource::new();
        assert_eq!(src.next(), 1);
        assert_eq!(src.next(), 2);
        assert_eq!(src.next(), 3);
    }
}
