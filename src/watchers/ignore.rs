//! Ignore watcher: tests incoming messages against ignore entries before
//! routing (spec.md §4.7; grounded on `auto_mode.cpp`'s mask-matching
//! pattern, applied here to a single-mask entry and an event-kind bit
//! instead of a mode/kick action).

use ircproto::{mask_matches, CaseMapping, User};

use crate::config::IgnoreEntry;

/// The kind of event an inbound message represents, for matching against
/// an entry's `IgnoreKinds` bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreEventKind {
    Privmsg,
    Notice,
    Ctcp,
    Invite,
}

pub struct IgnoreWatcher;

impl IgnoreWatcher {
    /// Whether `user`'s message of `kind` on `server_key` should be
    /// swallowed: it never opens a new buffer, though the caller may still
    /// choose to echo a note about it to the server buffer.
    pub fn is_ignored(
        entries: &[IgnoreEntry],
        server_key: &str,
        user: &User,
        kind: IgnoreEventKind,
        casemapping: CaseMapping,
    ) -> bool {
        let full_mask = user.full_mask();
        entries.iter().any(|e| {
            e.server_key == server_key
                && mask_matches(&e.user_mask, &full_mask, casemapping)
                && match kind {
                    IgnoreEventKind::Privmsg => e.kinds.privmsg,
                    IgnoreEventKind::Notice => e.kinds.notice,
                    IgnoreEventKind::Ctcp => e.kinds.ctcp,
                    IgnoreEventKind::Invite => e.kinds.invite,
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IgnoreKinds;

    fn entry(kinds: IgnoreKinds) -> IgnoreEntry {
        IgnoreEntry { server_key: "Libera".into(), user_mask: "troll!*@*".into(), kinds }
    }

    #[test]
    fn matches_only_the_flagged_kinds() {
        let entries = vec![entry(IgnoreKinds { privmsg: true, notice: false, ctcp: false, invite: false })];
        let user = User::new("troll", "t", "h", CaseMapping::default());
        assert!(IgnoreWatcher::is_ignored(&entries, "Libera", &user, IgnoreEventKind::Privmsg, CaseMapping::default()));
        assert!(!IgnoreWatcher::is_ignored(&entries, "Libera", &user, IgnoreEventKind::Notice, CaseMapping::default()));
    }

    #[test]
    fn non_matching_mask_is_not_ignored() {
        let entries = vec![entry(IgnoreKinds { privmsg: true, notice: true, ctcp: true, invite: true })];
        let user = User::new("alice", "a", "h", CaseMapping::default());
        assert!(!IgnoreWatcher::is_ignored(&entries, "Libera", &user, IgnoreEventKind::Privmsg, CaseMapping::default()));
    }
}
