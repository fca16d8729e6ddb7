//! Contact watcher: cross-references contact entries against channel user
//! lists to report who's online, and follows nickname renames so a contact
//! matched by a literal nickname mask keeps tracking the renamed user
//! (spec.md §4.7; grounded on `contacts.cpp`'s `find_impl` wildcard
//! cross-reference and its rename-follow counterpart in `auto_mode.cpp`'s
//! `update_user`).

use ircproto::{mask_matches, CaseMapping, User};

use crate::config::ContactEntry;

pub struct ContactWatcher;

impl ContactWatcher {
    /// Contacts whose mask matches a user currently present in `members`.
    pub fn online_contacts<'a>(
        entries: &'a [ContactEntry],
        server_key: &str,
        members: &[User],
        casemapping: CaseMapping,
    ) -> Vec<&'a ContactEntry> {
        entries
            .iter()
            .filter(|e| {
                (e.server_key == "*" || e.server_key == server_key)
                    && members.iter().any(|u| mask_matches(&e.user_mask, &u.full_mask(), casemapping))
            })
            .collect()
    }

    /// When `old_nick` renames to `new_nick`, rewrites any entry whose mask
    /// is a literal `old_nick!*@*` nickname mask (no wildcard in the
    /// nickname part) so it keeps matching the renamed user. Masks that
    /// pin a user/host instead of the nickname are left untouched, mirroring
    /// `auto_mode::update_user`'s "only adjust when matched by nick alone".
    pub fn follow_rename(entries: &mut [ContactEntry], old_nick: &str, new_nick: &str, _casemapping: CaseMapping) {
        for entry in entries.iter_mut() {
            if let Some(rest) = entry.user_mask.strip_prefix(old_nick) {
                if rest == "!*@*" && !old_nick.contains(['*', '?']) {
                    entry.user_mask = format!("{new_nick}!*@*");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mask: &str) -> ContactEntry {
        ContactEntry { name: "Alice".into(), group: "friends".into(), server_key: "Libera".into(), user_mask: mask.into() }
    }

    #[test]
    fn finds_online_contact_by_nickname_mask() {
        let entries = vec![entry("alice!*@*")];
        let members = vec![User::new("alice", "a", "h", CaseMapping::default())];
        let online = ContactWatcher::online_contacts(&entries, "Libera", &members, CaseMapping::default());
        assert_eq!(online.len(), 1);
    }

    #[test]
    fn absent_contact_is_not_online() {
        let entries = vec![entry("alice!*@*")];
        let members = vec![User::new("bob", "b", "h", CaseMapping::default())];
        assert!(ContactWatcher::online_contacts(&entries, "Libera", &members, CaseMapping::default()).is_empty());
    }

    #[test]
    fn literal_nickname_mask_follows_rename() {
        let mut entries = vec![entry("alice!*@*")];
        ContactWatcher::follow_rename(&mut entries, "alice", "alice_away", CaseMapping::default());
        assert_eq!(entries[0].user_mask, "alice_away!*@*");
    }

    #[test]
    fn user_host_pinned_mask_is_left_alone() {
        let mut entries = vec![entry("*!*@example.com")];
        ContactWatcher::follow_rename(&mut entries, "alice", "alice_away", CaseMapping::default());
        assert_eq!(entries[0].user_mask, "*!*@example.com");
    }
}
