//! The `nick!user@host` user model, mask generation, and case-folded ordering.

use std::cmp::Ordering;
use std::fmt;

use crate::casemap::CaseMapping;

/// A parsed `nick[!user][@host]` triple, compared and hashed by case-folded
/// nickname only (per spec.md §3: "This is the only detail used in
/// determining the equality of two users").
#[derive(Clone, Debug)]
pub struct User {
    nickname: String,
    username: String,
    hostname: String,
    full_name: String,
    away: bool,
    casemapping: CaseMapping,
}

impl User {
    /// Parses `nick!user@host`, `nick!user`, or a bare `nick`.
    pub fn parse(s: &str, casemapping: CaseMapping) -> User {
        let (nick_part, rest) = match s.find('!') {
            Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
            None => (s, None),
        };
        let (username, hostname) = match rest {
            Some(rest) => match rest.find('@') {
                Some(idx) => (rest[..idx].to_owned(), rest[idx + 1..].to_owned()),
                None => (rest.to_owned(), String::new()),
            },
            None => (String::new(), String::new()),
        };

        User {
            nickname: nick_part.to_owned(),
            username,
            hostname,
            full_name: String::new(),
            away: false,
            casemapping,
        }
    }

    /// Builds a user directly from its parts (e.g. from `RPL_WHOISUSER`).
    pub fn new(nickname: &str, username: &str, hostname: &str, casemapping: CaseMapping) -> User {
        User {
            nickname: nickname.to_owned(),
            username: username.to_owned(),
            hostname: hostname.to_owned(),
            full_name: String::new(),
            away: false,
            casemapping,
        }
    }

    /// The nickname, as cased on the wire.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// The case-folded nickname, suitable as a map key.
    pub fn key(&self) -> String {
        self.casemapping.fold(&self.nickname)
    }

    /// The username (ident), or empty if unknown.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The hostname, or empty if unknown.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The user's full/real name, populated from `RPL_WHOISUSER` or similar.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Sets the full/real name.
    pub fn set_full_name(&mut self, name: impl Into<String>) {
        self.full_name = name.into();
    }

    /// Whether the user is currently marked away.
    pub fn away(&self) -> bool {
        self.away
    }

    /// Sets the away flag (from `RPL_AWAY`, `305`/`306`, or a `WHOIS` `G`/`H`).
    pub fn set_away(&mut self, away: bool) {
        self.away = away;
    }

    /// The case-folding scheme used for this user's key and comparisons.
    pub fn casemapping(&self) -> CaseMapping {
        self.casemapping
    }

    /// A ban mask: `nick!*@*` when the host is unknown, else `*!*@host`.
    pub fn ban_mask(&self) -> String {
        if self.hostname.is_empty() || self.hostname == "*" {
            format!("{}!*@*", self.nickname)
        } else {
            format!("*!*@{}", self.hostname)
        }
    }

    /// An ignore mask: as specific as the known user/host allow, falling back
    /// to the ban mask when neither is known.
    pub fn ignore_mask(&self) -> String {
        if (self.hostname.is_empty() || self.hostname == "*")
            && (self.username.is_empty() || self.username == "*")
        {
            format!("{}!*@*", self.nickname)
        } else {
            format!("*!{}@{}", self.username, self.hostname)
        }
    }

    /// A notify-list mask; identical to the ignore mask.
    pub fn notify_mask(&self) -> String {
        self.ignore_mask()
    }

    /// An auto-mode mask; identical to the ignore mask.
    pub fn auto_mode_mask(&self) -> String {
        self.ignore_mask()
    }

    /// `nick!user@host`, suitable as a `PRIVMSG` target for responding.
    pub fn full_mask(&self) -> String {
        format!("{}!{}@{}", self.nickname, self.username, self.hostname)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nickname)?;
        if !self.username.is_empty() || !self.hostname.is_empty() {
            write!(f, "!{}@{}", self.username, self.hostname)?;
        }
        Ok(())
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.casemapping.eq(&self.nickname, &other.nickname)
    }
}

impl Eq for User {}

impl PartialOrd for User {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for User {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Matches a case-folded-wildcard mask (`*`/`?`) like `ban_mask`/`ignore_mask`
/// produce, against a full `nick!user@host` string.
pub fn mask_matches(mask: &str, full_mask: &str, casemapping: CaseMapping) -> bool {
    let mask: Vec<char> = casemapping.fold(mask).chars().collect();
    let text: Vec<char> = casemapping.fold(full_mask).chars().collect();
    wildcard_match(&mask, &text)
}

fn wildcard_match(mask: &[char], text: &[char]) -> bool {
    match mask.first() {
        None => text.is_empty(),
        Some('*') => {
            wildcard_match(&mask[1..], text)
                || (!text.is_empty() && wildcard_match(mask, &text[1..]))
        }
        Some('?') => !text.is_empty() && wildcard_match(&mask[1..], &text[1..]),
        Some(c) => text.first() == Some(c) && wildcard_match(&mask[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_triple() {
        let u = User::parse("alice!bob@example.com", CaseMapping::Rfc1459);
        assert_eq!(u.nickname(), "alice");
        assert_eq!(u.username(), "bob");
        assert_eq!(u.hostname(), "example.com");
    }

    #[test]
    fn parses_bare_nick() {
        let u = User::parse("alice", CaseMapping::Rfc1459);
        assert_eq!(u.nickname(), "alice");
        assert_eq!(u.username(), "");
    }

    #[test]
    fn equality_is_by_folded_nickname_only() {
        let a = User::new("Alice", "x", "a.example.com", CaseMapping::Rfc1459);
        let b = User::new("ALICE", "y", "b.example.com", CaseMapping::Rfc1459);
        assert_eq!(a, b);
    }

    #[test]
    fn ban_mask_without_host_uses_nickname() {
        let u = User::parse("bob", CaseMapping::Rfc1459);
        assert_eq!(u.ban_mask(), "bob!*@*");
    }

    #[test]
    fn ban_mask_with_host_masks_nick_and_user() {
        let u = User::parse("bob!u@h", CaseMapping::Rfc1459);
        assert_eq!(u.ban_mask(), "*!*@h");
    }

    #[test]
    fn wildcard_mask_matching() {
        assert!(mask_matches("*!*@h", "bob!u@h", CaseMapping::Rfc1459));
        assert!(!mask_matches("*!*@h", "bob!u@other", CaseMapping::Rfc1459));
        assert!(mask_matches("b?b!*@*", "bob!u@h", CaseMapping::Rfc1459));
    }
}
