//! Auto-join watcher: on registration, JOINs every channel an entry names
//! for the (server, nickname) pair that just registered (spec.md §4.7).

use crate::config::AutoJoinEntry;

pub struct AutoJoinWatcher;

impl AutoJoinWatcher {
    /// Returns the channels to join for a just-registered `(network,
    /// nickname)` pair, matching against wildcard network entries.
    pub fn channels_for(entries: &[AutoJoinEntry], network: &str, nickname: &str) -> Vec<String> {
        entries
            .iter()
            .filter(|e| (e.network == "*" || e.network == network) && e.nickname == nickname)
            .map(|e| e.channel.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_wildcard_network_entries() {
        let entries = vec![
            AutoJoinEntry { network: "*".into(), nickname: "alice".into(), channel: "#rust".into() },
            AutoJoinEntry { network: "Libera".into(), nickname: "bob".into(), channel: "#other".into() },
        ];
        assert_eq!(AutoJoinWatcher::channels_for(&entries, "Libera", "alice"), vec!["#rust".to_string()]);
        assert!(AutoJoinWatcher::channels_for(&entries, "Libera", "carol").is_empty());
    }
}
