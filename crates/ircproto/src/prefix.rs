//! The message prefix: the origin the server attaches to a line.

use std::fmt;
use std::str::FromStr;

/// The prefix indicates the true origin of a message, according to the
/// server. It is either a bare server name, or a `nick[!user][@host]` triple.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// A server name, e.g. `irc.example.net`.
    ServerName(String),
    /// `nickname [ "!" username ] [ "@" hostname ]`.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parses a prefix out of the token that followed the leading `:` on a
    /// wire line (without the `:` itself).
    pub fn parse(s: &str) -> Prefix {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Active {
            Name,
            User,
            Host,
        }

        // A '.' before any '!' marks this as a bare server name: nicknames
        // cannot contain dots, but server names always do.
        if !s.contains('!') && s.contains('.') {
            return Prefix::ServerName(s.to_owned());
        }

        let mut name = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut active = Active::Name;

        for c in s.chars() {
            match c {
                '!' if active == Active::Name => active = Active::User,
                '@' if active == Active::User => active = Active::Host,
                _ => match active {
                    Active::Name => name.push(c),
                    Active::User => user.push(c),
                    Active::Host => host.push(c),
                },
            }
        }

        Prefix::Nickname(name, user, host)
    }

    /// The nickname, if this is a `Nickname` prefix.
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, ..) => Some(nick),
            Prefix::ServerName(_) => None,
        }
    }
}

impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::parse(s))
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => write!(f, "{}", name),
            Prefix::Nickname(nick, user, host) => {
                write!(f, "{}", nick)?;
                if !user.is_empty() {
                    write!(f, "!{}", user)?;
                }
                if !host.is_empty() {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_nickname_prefix() {
        assert_eq!(
            Prefix::parse("alice!user@host.example.com"),
            Prefix::Nickname("alice".into(), "user".into(), "host.example.com".into())
        );
    }

    #[test]
    fn parses_bare_nickname() {
        assert_eq!(
            Prefix::parse("alice"),
            Prefix::Nickname("alice".into(), String::new(), String::new())
        );
    }

    #[test]
    fn parses_server_name() {
        assert_eq!(
            Prefix::parse("irc.example.net"),
            Prefix::ServerName("irc.example.net".into())
        );
    }

    #[test]
    fn roundtrips_through_display() {
        let p = Prefix::parse("alice!user@host");
        assert_eq!(p.to_string(), "alice!user@host");
    }
}
