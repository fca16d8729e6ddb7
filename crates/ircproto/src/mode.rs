//! Channel/user modes and the `PREFIX`/`CHANTYPES` ISUPPORT tables.

use std::fmt;

use crate::error::ParseError;

/// User modes settable with `MODE <nick> <modes>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserMode {
    /// `a` - user is flagged as away.
    Away,
    /// `i` - user is invisible.
    Invisible,
    /// `w` - user receives wallops.
    Wallops,
    /// `r` - restricted connection.
    Restricted,
    /// `o` - operator.
    Oper,
    /// `O` - local operator.
    LocalOper,
    /// `s` - receives server notices.
    ServerNotices,
    /// Any mode letter this crate does not specifically model.
    Unknown(char),
}

impl UserMode {
    fn from_char(c: char) -> UserMode {
        use UserMode::*;
        match c {
            'a' => Away,
            'i' => Invisible,
            'w' => Wallops,
            'r' => Restricted,
            'o' => Oper,
            'O' => LocalOper,
            's' => ServerNotices,
            c => Unknown(c),
        }
    }

    fn takes_arg(&self) -> bool {
        false
    }
}

impl fmt::Display for UserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use UserMode::*;
        let c = match *self {
            Away => 'a',
            Invisible => 'i',
            Wallops => 'w',
            Restricted => 'r',
            Oper => 'o',
            LocalOper => 'O',
            ServerNotices => 's',
            Unknown(c) => c,
        };
        write!(f, "{}", c)
    }
}

/// Channel modes settable with `MODE <channel> <modes>`. The membership modes
/// (`qaohv`) are also the ones a `PREFIX` table maps to prefix characters;
/// see [`PrefixTable`] for the ordering those use in a channel's user list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// `b` - ban mask.
    Ban,
    /// `e` - ban exception mask.
    Exception,
    /// `I` - invite-exception mask.
    InviteException,
    /// `l` - user limit.
    Limit,
    /// `i` - invite-only.
    InviteOnly,
    /// `k` - channel key.
    Key,
    /// `m` - moderated.
    Moderated,
    /// `s` - secret.
    Secret,
    /// `t` - protected topic.
    ProtectedTopic,
    /// `n` - no external messages.
    NoExternalMessages,
    /// A membership/prefix mode (`q`, `a`, `o`, `h`, `v`, or an IRCd-specific
    /// extra) dynamically resolved against a [`PrefixTable`].
    Prefix(char),
    /// Any other mode letter.
    Unknown(char),
}

impl ChannelMode {
    fn from_char(c: char, prefixes: &PrefixTable) -> ChannelMode {
        use ChannelMode::*;
        match c {
            'b' => Ban,
            'e' => Exception,
            'I' => InviteException,
            'l' => Limit,
            'i' => InviteOnly,
            'k' => Key,
            'm' => Moderated,
            's' => Secret,
            't' => ProtectedTopic,
            'n' => NoExternalMessages,
            c if prefixes.mode_letters().contains(c) => Prefix(c),
            c => Unknown(c),
        }
    }

    fn takes_arg(&self) -> bool {
        use ChannelMode::*;
        matches!(
            self,
            Ban | Exception | InviteException | Limit | Key | Prefix(_)
        )
    }
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ChannelMode::*;
        let c = match *self {
            Ban => 'b',
            Exception => 'e',
            InviteException => 'I',
            Limit => 'l',
            InviteOnly => 'i',
            Key => 'k',
            Moderated => 'm',
            Secret => 's',
            ProtectedTopic => 't',
            NoExternalMessages => 'n',
            Prefix(c) => c,
            Unknown(c) => c,
        };
        write!(f, "{}", c)
    }
}

/// A single `+`/`-` mode change, with its optional argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode<T> {
    /// A mode being added.
    Plus(T, Option<String>),
    /// A mode being removed.
    Minus(T, Option<String>),
}

impl<T: fmt::Display> fmt::Display for Mode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Plus(m, Some(arg)) => write!(f, "+{} {}", m, arg),
            Mode::Minus(m, Some(arg)) => write!(f, "-{} {}", m, arg),
            Mode::Plus(m, None) => write!(f, "+{}", m),
            Mode::Minus(m, None) => write!(f, "-{}", m),
        }
    }
}

impl Mode<UserMode> {
    /// Parses a `MODE <nick> +i-w` style string, pulling arguments for
    /// modes that take one from the remaining space-separated parameters.
    pub fn parse_user(modes: &str, args: &[&str]) -> Result<Vec<Mode<UserMode>>, ParseError> {
        let mut out = Vec::new();
        let mut args = args.iter();
        let mut adding = true;
        for c in modes.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                c => {
                    let mode = UserMode::from_char(c);
                    let arg = if mode.takes_arg() {
                        args.next().map(|s| s.to_string())
                    } else {
                        None
                    };
                    out.push(if adding {
                        Mode::Plus(mode, arg)
                    } else {
                        Mode::Minus(mode, arg)
                    });
                }
            }
        }
        Ok(out)
    }
}

impl Mode<ChannelMode> {
    /// Parses a `MODE <channel> +o-b arg1 arg2` style string against the
    /// connection's current [`PrefixTable`], which tells the parser which
    /// letters are membership modes that take an argument.
    pub fn parse_channel(
        modes: &str,
        args: &[&str],
        prefixes: &PrefixTable,
    ) -> Result<Vec<Mode<ChannelMode>>, ParseError> {
        let mut out = Vec::new();
        let mut args = args.iter();
        let mut adding = true;
        for c in modes.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                c => {
                    let mode = ChannelMode::from_char(c, prefixes);
                    let arg = if mode.takes_arg() {
                        args.next().map(|s| s.to_string())
                    } else {
                        None
                    };
                    out.push(if adding {
                        Mode::Plus(mode, arg)
                    } else {
                        Mode::Minus(mode, arg)
                    });
                }
            }
        }
        Ok(out)
    }
}

/// The ISUPPORT `PREFIX=(modes)chars` table: an ordered mapping between
/// membership mode letters (highest rank first) and the prefix character a
/// `NAMES`/`WHO` reply renders for a user holding that mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixTable {
    pairs: Vec<(char, char)>,
}

impl Default for PrefixTable {
    /// The de-facto standard table most IRCds advertise even pre-ISUPPORT.
    fn default() -> Self {
        PrefixTable {
            pairs: vec![('o', '@'), ('v', '+')],
        }
    }
}

impl PrefixTable {
    /// Parses the value of an ISUPPORT `PREFIX=` token, e.g. `(qaohv)~&@%+`.
    pub fn parse(value: &str) -> Option<PrefixTable> {
        let value = value.strip_prefix('(')?;
        let (modes, chars) = value.split_once(')')?;
        if modes.len() != chars.len() {
            return None;
        }
        Some(PrefixTable {
            pairs: modes.chars().zip(chars.chars()).collect(),
        })
    }

    /// The mode letters this table recognizes, highest rank first.
    pub fn mode_letters(&self) -> String {
        self.pairs.iter().map(|(m, _)| *m).collect()
    }

    /// The prefix character for a mode letter, if recognized.
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.pairs.iter().find(|(m, _)| *m == mode).map(|(_, p)| *p)
    }

    /// The mode letter for a prefix character, if recognized.
    pub fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.pairs.iter().find(|(_, p)| *p == prefix).map(|(m, _)| *m)
    }

    /// The rank of a mode letter: lower is higher-privilege. Used to derive a
    /// channel user's `compare_value` per spec.md §3/§4.3.
    pub fn rank(&self, mode: char) -> Option<usize> {
        self.pairs.iter().position(|(m, _)| *m == mode)
    }

    /// Strips any leading prefix characters this table recognizes off a
    /// `NAMES`-reply token, returning the mode letters found (highest first,
    /// as they appeared) and the bare nickname.
    pub fn strip_prefixes<'a>(&self, token: &'a str) -> (Vec<char>, &'a str) {
        let mut modes = Vec::new();
        let mut rest = token;
        while let Some(c) = rest.chars().next() {
            match self.mode_for_prefix(c) {
                Some(mode) => {
                    modes.push(mode);
                    rest = &rest[c.len_utf8()..];
                }
                None => break,
            }
        }
        (modes, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_isupport_prefix_table() {
        let t = PrefixTable::parse("(qaohv)~&@%+").unwrap();
        assert_eq!(t.prefix_for_mode('o'), Some('@'));
        assert_eq!(t.mode_for_prefix('~'), Some('q'));
        assert_eq!(t.rank('q'), Some(0));
        assert_eq!(t.rank('v'), Some(4));
    }

    #[test]
    fn strips_multiple_prefixes() {
        let t = PrefixTable::parse("(qaohv)~&@%+").unwrap();
        let (modes, nick) = t.strip_prefixes("@bob");
        assert_eq!(modes, vec!['o']);
        assert_eq!(nick, "bob");
    }

    #[test]
    fn parses_channel_modes_with_args() {
        let t = PrefixTable::default();
        let modes = Mode::parse_channel("+ov", &["bob", "carol"], &t).unwrap();
        assert_eq!(
            modes,
            vec![
                Mode::Plus(ChannelMode::Prefix('o'), Some("bob".into())),
                Mode::Plus(ChannelMode::Prefix('v'), Some("carol".into())),
            ]
        );
    }

    #[test]
    fn parses_mixed_plus_minus() {
        let t = PrefixTable::default();
        let modes = Mode::parse_channel("+b-o", &["*!*@h", "bob"], &t).unwrap();
        assert_eq!(
            modes,
            vec![
                Mode::Plus(ChannelMode::Ban, Some("*!*@h".into())),
                Mode::Minus(ChannelMode::Prefix('o'), Some("bob".into())),
            ]
        );
    }
}
