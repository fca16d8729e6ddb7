//! The channel buffer: membership, topic, and mode metadata layered on top
//! of the base buffer (spec.md §3 "Channel buffer", §4.3 "channel user
//! ordering").

use std::collections::HashMap;

use ircproto::{CaseMapping, PrefixTable, User};

use crate::buffer::{Buffer, Kind};
use crate::id::{BufferId, ConnectionId};

/// A single entry in a channel's user list: the user plus the membership
/// prefix modes (`qaohv`) currently held, highest rank first.
#[derive(Clone, Debug)]
pub struct Member {
    pub user: User,
    pub modes: Vec<char>,
}

impl Member {
    pub fn new(user: User) -> Member {
        Member { user, modes: Vec::new() }
    }

    /// The sort key the user list orders by: rank of the highest mode held
    /// (or the unprivileged rank, one past the table's last entry), then
    /// case-folded nickname (spec.md §4.3: "users are ordered by their
    /// highest membership prefix, then alphabetically").
    pub fn compare_value(&self, prefixes: &PrefixTable) -> (usize, String) {
        let rank = self
            .modes
            .iter()
            .filter_map(|m| prefixes.rank(*m))
            .min()
            .unwrap_or(prefixes.mode_letters().len());
        (rank, self.user.key())
    }

    /// The single highest-ranked prefix character to render before the
    /// nickname (`@`, `+`, ...), if any.
    pub fn display_prefix(&self, prefixes: &PrefixTable) -> Option<char> {
        self.modes
            .iter()
            .filter_map(|m| prefixes.rank(*m).map(|r| (r, *m)))
            .min_by_key(|(r, _)| *r)
            .and_then(|(_, m)| prefixes.prefix_for_mode(m))
    }

    pub fn add_mode(&mut self, mode: char) {
        if !self.modes.contains(&mode) {
            self.modes.push(mode);
        }
    }

    pub fn remove_mode(&mut self, mode: char) {
        self.modes.retain(|m| *m != mode);
    }
}

/// One entry of a channel's ban, exception, or invite-exception list
/// (spec.md §3 "Channel buffer" list-mode metadata).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: chrono::DateTime<chrono::Utc>,
}

/// The fetch state of a channel's ban/exception/invite-exception list,
/// mirroring the WHOIS/WHO/LIST collector pattern spec.md §3 describes for
/// server-driven multi-line replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListState {
    Unfetched,
    Fetching,
    Fetched,
}

pub struct ChannelBuffer {
    pub buffer: Buffer,
    pub casemapping: CaseMapping,
    pub members: HashMap<String, Member>,
    pub topic: String,
    pub topic_set_by: String,
    pub topic_set_at: Option<chrono::DateTime<chrono::Utc>>,
    pub joined: bool,
    /// Set from the moment we send `JOIN` until the matching
    /// `RPL_ENDOFNAMES` swaps `pending_names` in, mirroring
    /// `channel_buffer::joining()` in the original client.
    pub joining: bool,
    /// Set while an `RPL_NAMREPLY` run is in flight, whether from the
    /// initial join or a later `/NAMES` refresh (`iUpdatingUserList`).
    pub updating_names: bool,
    /// Accumulates `RPL_NAMREPLY` rows until `RPL_ENDOFNAMES`, at which
    /// point it replaces `members` wholesale (`iNewNamesList`) rather than
    /// mutating the live list row by row.
    pending_names: HashMap<String, Member>,
    pub bans: Vec<ListEntry>,
    pub ban_state: ListState,
    pub exceptions: Vec<ListEntry>,
    pub exception_state: ListState,
    pub invite_exceptions: Vec<ListEntry>,
    pub invite_exception_state: ListState,
}

impl ChannelBuffer {
    pub fn new(
        id: BufferId,
        connection_id: ConnectionId,
        name: String,
        casemapping: CaseMapping,
        capacity: usize,
    ) -> ChannelBuffer {
        ChannelBuffer {
            buffer: Buffer::new(id, connection_id, Kind::Channel, name, capacity),
            casemapping,
            members: HashMap::new(),
            topic: String::new(),
            topic_set_by: String::new(),
            topic_set_at: None,
            joined: false,
            joining: false,
            updating_names: false,
            pending_names: HashMap::new(),
            bans: Vec::new(),
            ban_state: ListState::Unfetched,
            exceptions: Vec::new(),
            exception_state: ListState::Unfetched,
            invite_exceptions: Vec::new(),
            invite_exception_state: ListState::Unfetched,
        }
    }

    pub fn insert_member(&mut self, member: Member) {
        self.members.insert(member.user.key(), member);
    }

    pub fn remove_member(&mut self, key: &str) -> Option<Member> {
        self.members.remove(key)
    }

    pub fn member(&self, nickname: &str) -> Option<&Member> {
        self.members.get(&self.casemapping.fold(nickname))
    }

    pub fn member_mut(&mut self, nickname: &str) -> Option<&mut Member> {
        self.members.get_mut(&self.casemapping.fold(nickname))
    }

    /// Renames a member in place when the server reports a `NICK` change,
    /// preserving their held modes.
    pub fn rename_member(&mut self, old_key: &str, new_user: User) {
        if let Some(mut member) = self.members.remove(old_key) {
            member.user = new_user;
            self.members.insert(member.user.key(), member);
        }
    }

    /// Returns members ordered for display: by membership rank, then
    /// case-folded nickname (spec.md §4.3).
    pub fn ordered_members(&self, prefixes: &PrefixTable) -> Vec<&Member> {
        let mut members: Vec<&Member> = self.members.values().collect();
        members.sort_by_key(|m| m.compare_value(prefixes));
        members
    }

    pub fn clear_members(&mut self) {
        self.members.clear();
    }

    pub fn set_topic(&mut self, topic: String, set_by: String, set_at: chrono::DateTime<chrono::Utc>) {
        self.topic = topic;
        self.topic_set_by = set_by;
        self.topic_set_at = Some(set_at);
    }

    /// Marks the channel as awaiting a `JOIN` to be confirmed by the
    /// server. Cleared once the matching `RPL_ENDOFNAMES` lands.
    pub fn begin_join(&mut self) {
        self.joining = true;
        self.begin_names_update();
    }

    /// Starts a fresh `RPL_NAMREPLY` accumulation, discarding any previous
    /// in-flight run (a repeated `/NAMES` before the first finished).
    pub fn begin_names_update(&mut self) {
        self.updating_names = true;
        self.pending_names.clear();
    }

    /// Folds one `RPL_NAMREPLY` token (e.g. `"@bob"`) into the pending
    /// membership list, splitting its prefix characters into modes via
    /// `prefixes`.
    pub fn accumulate_name(&mut self, token: &str, prefixes: &PrefixTable) {
        let (modes, nick) = prefixes.strip_prefixes(token);
        if nick.is_empty() {
            return;
        }
        let mut member = Member::new(User::new(nick, "", "", self.casemapping));
        for mode in modes {
            member.add_mode(mode);
        }
        self.pending_names.insert(member.user.key(), member);
    }

    /// Swaps the accumulated names in as the live membership list on
    /// `RPL_ENDOFNAMES`, the point at which `iNewNamesList` replaces
    /// `iUsers` wholesale in the original client.
    pub fn finish_names_update(&mut self) {
        self.members = std::mem::take(&mut self.pending_names);
        self.updating_names = false;
        self.joining = false;
        self.joined = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(nick: &str) -> Member {
        Member::new(User::new(nick, "u", "h", CaseMapping::default()))
    }

    #[test]
    fn orders_by_rank_then_nickname() {
        let prefixes = PrefixTable::parse("(ov)@+").unwrap();
        let mut chan = ChannelBuffer::new(BufferId(1), ConnectionId(1), "#t".into(), CaseMapping::default(), 10);

        let mut op = member("Zed");
        op.add_mode('o');
        let mut voice = member("Amy");
        voice.add_mode('v');
        let plain = member("Bob");

        chan.insert_member(op);
        chan.insert_member(voice);
        chan.insert_member(plain);

        let ordered = chan.ordered_members(&prefixes);
        let names: Vec<&str> = ordered.iter().map(|m| m.user.nickname()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Bob"]);
    }

    #[test]
    fn display_prefix_picks_highest_rank() {
        let prefixes = PrefixTable::parse("(qaohv)~&@%+").unwrap();
        let mut m = member("bob");
        m.add_mode('v');
        m.add_mode('o');
        assert_eq!(m.display_prefix(&prefixes), Some('@'));
    }

    #[test]
    fn rename_preserves_modes() {
        let mut chan = ChannelBuffer::new(BufferId(1), ConnectionId(1), "#t".into(), CaseMapping::default(), 10);
        let mut op = member("bob");
        op.add_mode('o');
        let old_key = op.user.key();
        chan.insert_member(op);
        chan.rename_member(&old_key, User::new("bobby", "u", "h", CaseMapping::default()));
        let renamed = chan.member("bobby").unwrap();
        assert_eq!(renamed.modes, vec!['o']);
        assert!(chan.member("bob").is_none());
    }
}
