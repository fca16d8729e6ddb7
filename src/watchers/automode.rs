//! Auto-mode watcher: when a known user joins a channel we operate in,
//! applies the matching entry's mode or ban-kick (spec.md §4.7; grounded on
//! `auto_mode.cpp`'s `auto_mode::matches`, translated from its three-field
//! nick/user/host comparison to a single `nick!user@host` mask match since
//! this crate models masks as one wildcard string, per `ircproto::user`).

use ircproto::{mask_matches, CaseMapping, User};

use crate::config::{AutoModeEntry, AutoModeType};

/// An action the watcher wants applied to the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutoModeAction {
    Op(String),
    Voice(String),
    BanKick(String, String),
}

pub struct AutoModeWatcher;

impl AutoModeWatcher {
    /// Finds the action to take for `user` just seen in `channel`, provided
    /// we hold channel-operator status there (checked by the caller before
    /// acting — the watcher only matches entries, it never checks our own
    /// privileges).
    pub fn action_for(
        entries: &[AutoModeEntry],
        server_key: &str,
        user: &User,
        channel: &str,
        casemapping: CaseMapping,
    ) -> Option<AutoModeAction> {
        let full_mask = user.full_mask();
        entries
            .iter()
            .find(|e| {
                e.server_key == server_key
                    && (e.channel_pattern == "*" || e.channel_pattern == channel)
                    && mask_matches(&e.user_mask, &full_mask, casemapping)
            })
            .map(|e| match e.kind {
                AutoModeType::Op => AutoModeAction::Op(user.nickname().to_string()),
                AutoModeType::Voice => AutoModeAction::Voice(user.nickname().to_string()),
                AutoModeType::BanKick => {
                    AutoModeAction::BanKick(user.ban_mask(), e.data.clone())
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: AutoModeType, mask: &str) -> AutoModeEntry {
        AutoModeEntry {
            server_key: "Libera".into(),
            user_mask: mask.into(),
            channel_pattern: "*".into(),
            kind,
            data: "bye".into(),
        }
    }

    #[test]
    fn matching_entry_ops_the_user() {
        let entries = vec![entry(AutoModeType::Op, "alice!*@*")];
        let user = User::new("alice", "a", "h", CaseMapping::default());
        let action = AutoModeWatcher::action_for(&entries, "Libera", &user, "#rust", CaseMapping::default());
        assert_eq!(action, Some(AutoModeAction::Op("alice".into())));
    }

    #[test]
    fn ban_kick_uses_entry_data_as_kick_reason() {
        let entries = vec![entry(AutoModeType::BanKick, "troll!*@*")];
        let user = User::new("troll", "t", "h", CaseMapping::default());
        let action = AutoModeWatcher::action_for(&entries, "Libera", &user, "#rust", CaseMapping::default());
        assert_eq!(action, Some(AutoModeAction::BanKick("*!*@h".into(), "bye".into())));
    }

    #[test]
    fn non_matching_mask_yields_nothing() {
        let entries = vec![entry(AutoModeType::Op, "bob!*@*")];
        let user = User::new("alice", "a", "h", CaseMapping::default());
        assert!(AutoModeWatcher::action_for(&entries, "Libera", &user, "#rust", CaseMapping::default()).is_none());
    }
}
