//! The textual (non-numeric) commands this crate understands.

use std::fmt;

/// A textual IRC command, typed by name. Mirrors the subset of RFC 1459/2812
/// (plus common IRCv3 and CTCP-adjacent extensions) spec.md §4.1 names as
/// commands the engine must classify. Anything else keeps its raw command
/// string via [`crate::message::MessageKind::Unknown`] instead of living
/// here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `PASS :password`
    Pass(String),
    /// `NICK :nickname`
    Nick(String),
    /// `USER user mode * :realname`
    User(String, String, String),
    /// `QUIT :comment`
    Quit(Option<String>),
    /// `JOIN chanlist [chankeys]`
    Join(String, Option<String>),
    /// `PART chanlist :[comment]`
    Part(String, Option<String>),
    /// `TOPIC channel :[topic]`
    Topic(String, Option<String>),
    /// `NAMES [chanlist]`
    Names(Option<String>),
    /// `LIST [chanlist]`
    List(Option<String>),
    /// `INVITE nickname channel`
    Invite(String, String),
    /// `KICK channel user :[comment]`
    Kick(String, String, Option<String>),
    /// `PRIVMSG target :message`
    Privmsg(String, String),
    /// `NOTICE target :message`
    Notice(String, String),
    /// `WHO [mask]`
    Who(Option<String>),
    /// `WHOIS [target] masklist`
    Whois(Option<String>, String),
    /// `PING server1 :[server2]`
    Ping(String, Option<String>),
    /// `PONG server :[server2]`
    Pong(String, Option<String>),
    /// `MODE target modestring [args...]`
    Mode(String, String, Vec<String>),
    /// `AWAY :[message]`
    Away(Option<String>),
    /// Any other textual command, kept with its raw command string and
    /// parameters so it can still round-trip to the wire unmodified.
    Unknown(String, Vec<String>),
}

impl Command {
    /// The wire command name for this command.
    pub fn name(&self) -> &str {
        use Command::*;
        match self {
            Pass(_) => "PASS",
            Nick(_) => "NICK",
            User(..) => "USER",
            Quit(_) => "QUIT",
            Join(..) => "JOIN",
            Part(..) => "PART",
            Topic(..) => "TOPIC",
            Names(_) => "NAMES",
            List(_) => "LIST",
            Invite(..) => "INVITE",
            Kick(..) => "KICK",
            Privmsg(..) => "PRIVMSG",
            Notice(..) => "NOTICE",
            Who(_) => "WHO",
            Whois(..) => "WHOIS",
            Ping(..) => "PING",
            Pong(..) => "PONG",
            Mode(..) => "MODE",
            Away(_) => "AWAY",
            Unknown(name, _) => name,
        }
    }

    /// Builds a typed `Command` from a wire command name and its already
    /// tokenized parameters (last one may be a trailing/colon parameter,
    /// already stripped of its leading `:`).
    pub fn from_wire(name: &str, params: &[String]) -> Command {
        use Command::*;
        let p = |i: usize| params.get(i).cloned().unwrap_or_default();
        let opt = |i: usize| params.get(i).cloned();
        match name.to_ascii_uppercase().as_str() {
            "PASS" => Pass(p(0)),
            "NICK" => Nick(p(0)),
            "USER" if params.len() >= 4 => User(p(0), p(1), params[3].clone()),
            "QUIT" => Quit(opt(0)),
            "JOIN" => Join(p(0), opt(1)),
            "PART" => Part(p(0), opt(1)),
            "TOPIC" => Topic(p(0), opt(1)),
            "NAMES" => Names(opt(0)),
            "LIST" => List(opt(0)),
            "INVITE" if params.len() >= 2 => Invite(p(0), p(1)),
            "KICK" if params.len() >= 2 => Kick(p(0), p(1), opt(2)),
            "PRIVMSG" if params.len() >= 2 => Privmsg(p(0), p(1)),
            "NOTICE" if params.len() >= 2 => Notice(p(0), p(1)),
            "WHO" => Who(opt(0)),
            "WHOIS" => {
                if params.len() >= 2 {
                    Whois(opt(0), p(1))
                } else {
                    Whois(None, p(0))
                }
            }
            "PING" => Ping(p(0), opt(1)),
            "PONG" => Pong(p(0), opt(1)),
            "MODE" if !params.is_empty() => {
                Mode(p(0), opt(1).unwrap_or_default(), params.get(2..).unwrap_or(&[]).to_vec())
            }
            "AWAY" => Away(opt(0)),
            _ => Unknown(name.to_owned(), params.to_vec()),
        }
    }

    /// Renders this command's parameters, in wire order, not including the
    /// command name itself. The caller (`Message::to_wire`) decides which of
    /// these (if any) becomes the trailing `:`-prefixed parameter.
    pub fn params(&self) -> Vec<String> {
        use Command::*;
        match self {
            Pass(pw) => vec![pw.clone()],
            Nick(n) => vec![n.clone()],
            User(u, m, r) => vec![u.clone(), m.clone(), "*".to_owned(), r.clone()],
            Quit(Some(msg)) => vec![msg.clone()],
            Quit(None) => vec![],
            Join(chans, Some(keys)) => vec![chans.clone(), keys.clone()],
            Join(chans, None) => vec![chans.clone()],
            Part(chans, Some(msg)) => vec![chans.clone(), msg.clone()],
            Part(chans, None) => vec![chans.clone()],
            Topic(chan, Some(topic)) => vec![chan.clone(), topic.clone()],
            Topic(chan, None) => vec![chan.clone()],
            Names(Some(chans)) => vec![chans.clone()],
            Names(None) => vec![],
            List(Some(chans)) => vec![chans.clone()],
            List(None) => vec![],
            Invite(nick, chan) => vec![nick.clone(), chan.clone()],
            Kick(chan, user, Some(msg)) => vec![chan.clone(), user.clone(), msg.clone()],
            Kick(chan, user, None) => vec![chan.clone(), user.clone()],
            Privmsg(target, msg) => vec![target.clone(), msg.clone()],
            Notice(target, msg) => vec![target.clone(), msg.clone()],
            Who(Some(mask)) => vec![mask.clone()],
            Who(None) => vec![],
            Whois(Some(target), mask) => vec![target.clone(), mask.clone()],
            Whois(None, mask) => vec![mask.clone()],
            Ping(s1, Some(s2)) => vec![s1.clone(), s2.clone()],
            Ping(s1, None) => vec![s1.clone()],
            Pong(s1, Some(s2)) => vec![s1.clone(), s2.clone()],
            Pong(s1, None) => vec![s1.clone()],
            Mode(target, modes, args) => {
                let mut out = vec![target.clone()];
                if !modes.is_empty() {
                    out.push(modes.clone());
                }
                out.extend(args.iter().cloned());
                out
            }
            Away(Some(msg)) => vec![msg.clone()],
            Away(None) => vec![],
            Unknown(_, params) => params.clone(),
        }
    }

    /// The index into `params()` that holds this command's "body" parameter,
    /// i.e. the one a `PRIVMSG` line splitter or CTCP unwrapper should treat
    /// as free text, per spec.md §4.1's content-param table.
    pub fn content_param_index(&self) -> Option<usize> {
        use Command::*;
        match self {
            Quit(_) => Some(0),
            Notice(..) | Privmsg(..) | Topic(..) | Part(..) => Some(1),
            Kick(..) => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privmsg_content_param_is_index_one() {
        let c = Command::Privmsg("#chan".into(), "hello".into());
        assert_eq!(c.content_param_index(), Some(1));
        assert_eq!(c.params(), vec!["#chan".to_string(), "hello".to_string()]);
    }

    #[test]
    fn kick_content_param_is_index_two() {
        let c = Command::from_wire("KICK", &["#c".into(), "bob".into(), "bye".into()]);
        assert_eq!(c, Command::Kick("#c".into(), "bob".into(), Some("bye".into())));
        assert_eq!(c.content_param_index(), Some(2));
    }

    #[test]
    fn unknown_command_round_trips_params() {
        let c = Command::from_wire("FOOBAR", &["a".into(), "b".into()]);
        assert_eq!(c, Command::Unknown("FOOBAR".into(), vec!["a".into(), "b".into()]));
        assert_eq!(c.name(), "FOOBAR");
    }

    #[test]
    fn user_command_fixes_mode_and_star() {
        let c = Command::from_wire("USER", &["alice".into(), "0".into(), "*".into(), "Alice".into()]);
        assert_eq!(c, Command::User("alice".into(), "0".into(), "Alice".into()));
        assert_eq!(c.params(), vec!["alice", "0", "*", "Alice"]);
    }
}
